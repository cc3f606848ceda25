#[tokio::main(flavor = "current_thread")]
async fn main() {
    let res = pmon::cli::run().await;
    if let Err(err) = res {
        pmon::clean_logger();
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
