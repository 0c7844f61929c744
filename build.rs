use dotenvy::dotenv;
use std::env::var;

fn main() {
    dotenv().ok();

    println!("cargo:rerun-if-env-changed=OPENAI_KEY");
    println!("cargo:rustc-check-cfg=cfg(no_key)");

    if var("OPENAI_KEY").is_err() {
        println!("cargo:rustc-cfg=no_key");
    }
}
