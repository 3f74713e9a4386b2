/// Display version information
pub fn execute() {
    println!("arisan {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for Arisan rotating savings groups");
}
