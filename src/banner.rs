// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    // Using a raw string literal for the multi-line banner
    let banner = r#"
                             _                                                
  _____ _   _ _____  ____ __(_)  ___ _____    ____ _   _ ____  ____  _____  ____ 
 | ___ ( \ / ) ___ |/ ___) ___)/___) ___ |  / ___) | | |  _ \|  _ \| ___ |/ ___)
 | ____|) X (| ____| |  ( (___|___ | ____| | |   | |_| | | | | | | | ____| |    
 |_____|_/ \_)_____)_|   \____|___/|_____) |_|   |____/|_| |_|_| |_|_____)_|    

    Sandboxed Code Exercise Runner
"#;
    println!("{}", banner);
}
