//! # Kiosko Register Entry Point
//!
//! Console front end for one register. The setup lives in `lib.rs` so it
//! can be tested.

#[tokio::main]
async fn main() {
    if let Err(e) = kiosko_register::run().await {
        eprintln!("kiosko-register: {}", e);
        std::process::exit(1);
    }
}
