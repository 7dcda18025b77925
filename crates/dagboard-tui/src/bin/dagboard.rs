use dagboard_tui::cli::{run_with_backend, ProcessBackend};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let code = run_with_backend(&args, &ProcessBackend, &mut stdout, &mut stderr);
    std::process::exit(code);
}
