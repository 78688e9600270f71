use serde_json::json;

use super::types::{AnnotatedRecord, Entity};

/// Key holding the per-sentence list in an extraction reply.
pub const SENTENCES_KEY: &str = "sentences";

/// Line that introduces the numbered batch in the extraction prompt.
pub const BATCH_HEADER: &str =
    "Please process the following sentences and return the JSON object with the 'sentences' key:";

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a precise Burmese Concept and Named Entity Recognition (CNER) engine. You analyze
Burmese sentences, find every entity that belongs to the 18-class taxonomy below, and return
one machine-readable JSON object.

PROCESS:
1. Read the raw input line.
2. Remove non-linguistic artifacts: prefixes such as "photo :" or "image :", emojis,
   timestamps and other metadata. The output `text` must be clean.
3. Decide whether the cleaned text is a coherent Burmese sentence. Fragments, standalone
   names, gibberish and credit lines are invalid and must be left out of the output entirely.
4. Find entities exhaustively. Make several passes: obvious entities first, then subtler ones.
5. Copy each entity's `text` exactly as it appears in the sentence.
6. Give each entity the most accurate label. A title such as "သမ္မတ" is ROLE; a name such as
   "ဦးသိန်းစိန်" is PER. "ဒေါ်လာ" is MONEY; "၁၀၀" is NUM unless it is part of an amount like
   "ဒေါ်လာ ၁၀၀".
7. Return a single JSON object with a "sentences" key holding a list of objects, each with
   `text` (the cleaned sentence) and `entities` (a list of {"text", "label"} objects).

TAXONOMY:
- PER: people ("ဦးနု", "ဒေါ်အောင်ဆန်းစုကြည်")
- LOC: locations ("ရန်ကုန်", "မြန်မာနိုင်ငံ", "ကမ္ဘာ")
- ORG: organizations ("ကုလသမဂ္ဂ", "Google", "ကြံ့ခိုင်ရေးပါတီ")
- DATE: dates and periods ("၂၀၂၄", "ဇန်နဝါရီလ", "နှစ်သစ်ကူး")
- NUM: numbers ("၁၀", "သုံးဆယ်", "၅,၀၀၀")
- ROLE: titles and jobs ("ဝန်ကြီးချုပ်", "သမ္မတ", "ဆရာဝန်")
- EVENT: named events ("ပင်လုံညီလာခံ", "သင်္ကြန်", "ကမ္ဘာ့ဖလား")
- LAW: named laws ("ဖွဲ့စည်းပုံအခြေခံဥပဒေ", "အသရေဖျက်မှု")
- THEORY: ideologies and religions ("ဒီမိုကရေစီ", "ဗုဒ္ဓဘာသာ")
- GROUP: social and ethnic groups ("ကရင်လူမျိုး", "မြန်မာစစ်တပ်")
- FOOD: specific foods ("မုန့်ဟင်းခါး", "လက်ဖက်ရည်")
- FIELD: fields of study and technology ("ဆေးပညာ", "AI")
- LANGUAGE: languages ("မြန်မာစာ", "English")
- ART: named artworks ("မှန်နန်းရာဇဝင်", "မောင်ဘချစ်")
- ARTIFACT: man-made objects ("ဒရုန်း", "Apple Watch", "ကား")
- SUBSTANCE: materials and resources ("ကျောက်စိမ်း", "ရေနံ")
- DISEASE: medical conditions ("ကိုဗစ်-၁၉", "သွေးတိုး")
- MONEY: currencies and amounts ("ကျပ်", "ဒေါ်လာ", "$399")

RULES:
- Be exhaustive. When unsure whether something is an entity, extract it.
- A title is never a person.
- Output ONLY the JSON object: no introduction, no explanation, no markdown fences.
- Invalid sentences must not appear in the output in any form.
- Only extract entities that are explicitly present in the text.
"#;

pub const VALIDATION_PROMPT: &str = r#"
You are a CNER validation and correction engine. You receive a Burmese sentence and the JSON
record of entities extracted from it. Review the record rigorously and return a fully
corrected JSON record.

PROCESS:
1. Read the whole sentence to understand its context.
2. Check each entity: its `text` must match a span of the sentence exactly, and its `label`
   must be the most precise choice from the taxonomy (ROLE vs PER, THEORY for religions,
   LOC for countries).
3. Look for missed entities in three passes: obvious ones (people, places, organizations),
   conceptual ones (ROLE, THEORY, EVENT, FIELD), and fine-grained ones (LAW, ART, SUBSTANCE,
   ARTIFACT).
4. Keep labelling consistent across the sentence.
5. Assemble the final record with the original, unchanged `text` and the corrected,
   complete `entities` list.

RULES:
- Output ONLY the corrected JSON record: {"text": ..., "entities": [...]}.
- Never change the `text` field.
- If the record is already correct and complete, return it unchanged.
- If the text is not a real sentence, return it with an empty `entities` list.
- Use only these labels: PER, LOC, ORG, DATE, NUM, ROLE, EVENT, LAW, THEORY, GROUP, FOOD,
  FIELD, LANGUAGE, ART, ARTIFACT, SUBSTANCE, DISEASE, MONEY. Never invent a label.
"#;

// ═══════════════════════════════════════════
// Few-shot pool
// ═══════════════════════════════════════════

/// A sentence in an example's expected output.
#[derive(Debug)]
pub struct ExampleSentence {
    pub text: &'static str,
    pub entities: &'static [(&'static str, &'static str)],
}

/// An input line and the reply the oracle should give for it.
#[derive(Debug)]
pub struct FewShotExample {
    pub input: &'static str,
    pub sentences: &'static [ExampleSentence],
}

impl FewShotExample {
    /// The expected reply as a `{"sentences": [...]}` JSON value.
    pub fn expected_output(&self) -> serde_json::Value {
        let sentences: Vec<serde_json::Value> = self
            .sentences
            .iter()
            .map(|s| {
                let entities: Vec<serde_json::Value> = s
                    .entities
                    .iter()
                    .map(|(text, label)| json!({ "text": text, "label": label }))
                    .collect();
                json!({ "text": s.text, "entities": entities })
            })
            .collect();
        json!({ SENTENCES_KEY: sentences })
    }
}

pub const FEW_SHOT_EXAMPLES: &[FewShotExample] = &[
    FewShotExample {
        input: "photo : myphotosite ဝန်ကြီးချုပ် ဦးနု သည် ၁၉၄၇ ခုနှစ်တွင် ပင်လုံညီလာခံ သို့ တက်ရောက်ခဲ့သည်။ 📷",
        sentences: &[ExampleSentence {
            text: "ဝန်ကြီးချုပ် ဦးနု သည် ၁၉၄၇ ခုနှစ်တွင် ပင်လုံညီလာခံ သို့ တက်ရောက်ခဲ့သည်။",
            entities: &[
                ("ဝန်ကြီးချုပ်", "ROLE"),
                ("ဦးနု", "PER"),
                ("၁၉၄၇", "DATE"),
                ("ပင်လုံညီလာခံ", "EVENT"),
            ],
        }],
    },
    FewShotExample {
        input: "Credit: Photo by someone 📷",
        sentences: &[],
    },
    FewShotExample {
        input: "မြန်မာနိုင်ငံ တွင် ကျောက်စိမ်း နှင့် ရေနံ ထွက်ရှိပြီး မုန့်ဟင်းခါး သည် လူကြိုက်များသည်။",
        sentences: &[ExampleSentence {
            text: "မြန်မာနိုင်ငံ တွင် ကျောက်စိမ်း နှင့် ရေနံ ထွက်ရှိပြီး မုန့်ဟင်းခါး သည် လူကြိုက်များသည်။",
            entities: &[
                ("မြန်မာနိုင်ငံ", "LOC"),
                ("ကျောက်စိမ်း", "SUBSTANCE"),
                ("ရေနံ", "SUBSTANCE"),
                ("မုန့်ဟင်းခါး", "FOOD"),
            ],
        }],
    },
    FewShotExample {
        input: "ကိုဗစ်-၁၉ ကာလအတွင်း ကျန်းမာရေးဝန်ကြီးဌာန က ဒီမိုကရေစီ အရေးကို ဆွေးနွေးသည်။",
        sentences: &[ExampleSentence {
            text: "ကိုဗစ်-၁၉ ကာလအတွင်း ကျန်းမာရေးဝန်ကြီးဌာန က ဒီမိုကရေစီ အရေးကို ဆွေးနွေးသည်။",
            entities: &[
                ("ကိုဗစ်-၁၉", "DISEASE"),
                ("ကျန်းမာရေးဝန်ကြီးဌာန", "ORG"),
                ("ဒီမိုကရေစီ", "THEORY"),
            ],
        }],
    },
    FewShotExample {
        input: "Apple Watch အသစ်တစ်လုံးရဲ့ စျေးနှုန်းမှာ $399 ဖြစ်ပြီး AI နည်းပညာကို အသုံးပြုထားပါတယ်။",
        sentences: &[ExampleSentence {
            text: "Apple Watch အသစ်တစ်လုံးရဲ့ စျေးနှုန်းမှာ $399 ဖြစ်ပြီး AI နည်းပညာကို အသုံးပြုထားပါတယ်။",
            entities: &[("Apple Watch", "ARTIFACT"), ("$399", "MONEY"), ("AI", "FIELD")],
        }],
    },
    FewShotExample {
        input: "ဗမာလူမျိုး များသည် ဗုဒ္ဓဘာသာ ကို ကိုးကွယ်ကြပြီး ဖွဲ့စည်းပုံအခြေခံဥပဒေ ကို လေးစားလိုက်နာကြသည်။",
        sentences: &[ExampleSentence {
            text: "ဗမာလူမျိုး များသည် ဗုဒ္ဓဘာသာ ကို ကိုးကွယ်ကြပြီး ဖွဲ့စည်းပုံအခြေခံဥပဒေ ကို လေးစားလိုက်နာကြသည်။",
            entities: &[
                ("ဗမာလူမျိုး", "GROUP"),
                ("ဗုဒ္ဓဘာသာ", "THEORY"),
                ("ဖွဲ့စည်းပုံအခြေခံဥပဒေ", "LAW"),
            ],
        }],
    },
    FewShotExample {
        input: "မှန်နန်းရာဇဝင် ကို မြန်မာဘာသာ ဖြင့် ရေးသားခဲ့သည်။",
        sentences: &[ExampleSentence {
            text: "မှန်နန်းရာဇဝင် ကို မြန်မာဘာသာ ဖြင့် ရေးသားခဲ့သည်။",
            entities: &[("မှန်နန်းရာဇဝင်", "ART"), ("မြန်မာဘာသာ", "LANGUAGE")],
        }],
    },
];

// ═══════════════════════════════════════════
// Prompt builders
// ═══════════════════════════════════════════

/// Build the extraction prompt: system instructions, examples, numbered batch.
pub fn build_extraction_prompt(sentences: &[String], examples: &[&FewShotExample]) -> String {
    let mut prompt = String::with_capacity(EXTRACTION_SYSTEM_PROMPT.len() + sentences.len() * 200);
    prompt.push_str(EXTRACTION_SYSTEM_PROMPT.trim());
    prompt.push_str("\n\n");

    if !examples.is_empty() {
        prompt.push_str("Here are some examples of how to format the output:\n\n");
        for example in examples {
            let output = serde_json::to_string_pretty(&example.expected_output())
                .unwrap_or_else(|_| "{}".to_string());
            prompt.push_str(&format!("Input:\n{}\n\nOutput:\n{output}\n\n", example.input));
        }
    }

    prompt.push_str(BATCH_HEADER);
    prompt.push_str("\n\n");
    for (i, sentence) in sentences.iter().enumerate() {
        prompt.push_str(&format!("{}. {sentence}\n", i + 1));
    }
    prompt
}

/// Build the repair prompt for one record and its invalid entities.
pub fn build_correction_prompt(record: &AnnotatedRecord, invalid: &[Entity]) -> String {
    let invalid_json = serde_json::to_string_pretty(invalid).unwrap_or_else(|_| "[]".to_string());
    let record_json = serde_json::to_string_pretty(record).unwrap_or_else(|_| "{}".to_string());

    format!(
        "{}\n\n\
         The following objects in 'entities' have labels outside the taxonomy. Correct them.\n\n\
         Invalid objects:\n{invalid_json}\n\n\
         Original sentence: {}\n\n\
         Full original JSON:\n{record_json}",
        VALIDATION_PROMPT.trim(),
        record.text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotation::taxonomy::is_valid_label;

    #[test]
    fn few_shot_pool_uses_only_taxonomy_labels() {
        for example in FEW_SHOT_EXAMPLES {
            for sentence in example.sentences {
                for (_, label) in sentence.entities {
                    assert!(is_valid_label(label), "example label {label} not in taxonomy");
                }
            }
        }
    }

    #[test]
    fn few_shot_entities_are_substrings() {
        for example in FEW_SHOT_EXAMPLES {
            for sentence in example.sentences {
                for (text, _) in sentence.entities {
                    assert!(sentence.text.contains(text), "{text} not in {}", sentence.text);
                }
            }
        }
    }

    #[test]
    fn pool_contains_an_invalid_input_example() {
        assert!(FEW_SHOT_EXAMPLES.iter().any(|e| e.sentences.is_empty()));
        assert_eq!(FEW_SHOT_EXAMPLES.len(), 7);
    }

    #[test]
    fn expected_output_has_sentences_key() {
        let value = FEW_SHOT_EXAMPLES[1].expected_output();
        assert_eq!(value, json!({ "sentences": [] }));

        let value = FEW_SHOT_EXAMPLES[6].expected_output();
        assert_eq!(value["sentences"][0]["entities"][1]["label"], "LANGUAGE");
    }

    #[test]
    fn extraction_prompt_numbers_sentences_from_one() {
        let sentences = vec!["ပထမ စာကြောင်း။".to_string(), "ဒုတိယ စာကြောင်း။".to_string()];
        let prompt = build_extraction_prompt(&sentences, &[]);
        assert!(prompt.contains("1. ပထမ စာကြောင်း။\n2. ဒုတိယ စာကြောင်း။\n"));
        assert!(prompt.contains(BATCH_HEADER));
        assert!(!prompt.contains("Here are some examples"));
    }

    #[test]
    fn extraction_prompt_includes_examples() {
        let examples = vec![&FEW_SHOT_EXAMPLES[0], &FEW_SHOT_EXAMPLES[4]];
        let prompt = build_extraction_prompt(&["x".to_string()], &examples);
        assert!(prompt.starts_with("You are a precise Burmese"));
        assert!(prompt.contains(FEW_SHOT_EXAMPLES[0].input));
        assert!(prompt.contains("\"Apple Watch\""));
        // Examples come before the batch
        assert!(prompt.find("Apple Watch").unwrap() < prompt.find(BATCH_HEADER).unwrap());
    }

    #[test]
    fn correction_prompt_contains_record_and_invalid_objects() {
        let record = AnnotatedRecord::new(
            "ဦးနု သည် ရန်ကုန် သို့ သွားသည်။",
            vec![Entity::new("ဦးနု", "PERSON"), Entity::new("ရန်ကုန်", "LOC")],
        );
        let invalid = vec![Entity::new("ဦးနု", "PERSON")];
        let prompt = build_correction_prompt(&record, &invalid);

        assert!(prompt.starts_with("You are a CNER validation"));
        assert!(prompt.contains("\"label\": \"PERSON\""));
        assert!(prompt.contains("Original sentence: ဦးနု သည် ရန်ကုန် သို့ သွားသည်။"));
        assert!(prompt.contains("\"label\": \"LOC\""));
    }
}
