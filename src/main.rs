use field_upload::cli;

fn main() {
    match cli::process_cli() {
        cli::CliResult::Done => {}
        cli::CliResult::Exit(code) => std::process::exit(code),
    }
}
