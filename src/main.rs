use csds_client::cli::run_cli;

fn install_rustls_provider() {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        // Err means another thread installed a provider first
        let _ = ring::default_provider().install_default();
    }
}

#[tokio::main]
async fn main() {
    install_rustls_provider();

    if let Err(err) = run_cli().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
