fn main() {
    if let Err(err) = syllabus_cli::main() {
        eprintln!("Error: {}", err);

        for cause in err.iter_causes() {
            eprintln!("Caused by: {}", cause);
        }

        eprintln!("{}", err.backtrace());

        std::process::exit(1);
    }
}
