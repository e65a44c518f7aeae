use std::process;

fn main() {
    match dogma_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("dogma error: {err}");
            process::exit(1);
        }
    }
}
