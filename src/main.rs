// src/main.rs

use dirpub::{cli, logging, run};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("dirpub error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    // The watch loop is a plain thread; the runtime only drives the queue
    // socket and Ctrl-C.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("dirpub-rt")
        .enable_all()
        .build()?;

    run(args, runtime.handle().clone())
}
