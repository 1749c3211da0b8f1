use pipeboard::cli::{exit_code, run};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    // Windows consoles need ANSI processing switched on; a failure just means plain output
    let _ = enable_ansi_support::enable_ansi_support();

    if let Err(e) = run() {
        let code = exit_code(&e);
        if code == 1 {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("Internal error: {}", e);
            // Show error chain if available
            let mut chain = e.chain().skip(1).peekable();
            if chain.peek().is_some() {
                eprintln!("\nCaused by:");
                for (indent, cause) in chain.enumerate() {
                    eprintln!("{:indent$}  {}", "", cause, indent = indent + 1);
                }
            }
        }
        std::process::exit(code);
    }
}
