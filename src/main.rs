fn main() -> std::process::ExitCode {
    cnergen_lib::run()
}
