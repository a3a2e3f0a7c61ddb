fn main() {
    // option_env!() values are cached between builds unless cargo is told
    // to watch them.
    println!("cargo:rerun-if-env-changed=INMS_API_URL");
    println!("cargo:rerun-if-env-changed=INMS_CLIENT_CONTEXT");
}
