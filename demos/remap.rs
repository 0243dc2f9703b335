//! Option key remapping with a built-in French Mac layout.
//!
//! Run with: cargo run --example remap
//!
//! With the `serde` feature, a JSON layout file can be given instead:
//! cargo run --example remap --features serde -- my-layout.json
//!
//! Note: needs read access to /dev/input and write access to /dev/uinput.
//! Set RUST_LOG=debug to see every key event.

use optmap::{Config, DeadKeyDefinition, Mapping, MappingTable, Remapper};

fn azerty_mac() -> MappingTable {
    MappingTable::new("azerty-mac")
        .with_alt("5", Mapping::passthrough("5"))
        .with_alt("c", Mapping::unicode('©'))
        .with_alt("g", Mapping::unicode('ﬁ'))
        .with_alt("r", Mapping::unicode('®'))
        .with_alt("a", Mapping::unicode('æ'))
        .with_alt("o", Mapping::unicode('œ'))
        .with_alt("dot", Mapping::unicode('…'))
        .with_alt("e", Mapping::dead_key("acute", "´"))
        .with_alt("u", Mapping::dead_key("diaeresis", "¨"))
        .with_alt("i", Mapping::dead_key("circumflex", "ˆ"))
        .with_alt("n", Mapping::dead_key("tilde", "˜"))
        .with_shift_alt("5", Mapping::passthrough("5"))
        .with_shift_alt("c", Mapping::unicode('¢'))
        .with_shift_alt("a", Mapping::unicode('Æ'))
        .with_shift_alt("o", Mapping::unicode('Œ'))
        .with_dead_key(
            DeadKeyDefinition::new("acute", "´")
                .combine("e", "é")
                .combine("a", "á")
                .combine("i", "í")
                .combine("o", "ó")
                .combine("u", "ú")
                .combine("E", "É"),
        )
        .with_dead_key(
            DeadKeyDefinition::new("diaeresis", "¨")
                .combine("e", "ë")
                .combine("i", "ï")
                .combine("u", "ü")
                .combine("y", "ÿ"),
        )
        .with_dead_key(
            DeadKeyDefinition::new("circumflex", "ˆ")
                .combine("a", "â")
                .combine("e", "ê")
                .combine("i", "î")
                .combine("o", "ô")
                .combine("u", "û"),
        )
        .with_dead_key(
            DeadKeyDefinition::new("tilde", "˜")
                .combine("n", "ñ")
                .combine("a", "ã")
                .combine("o", "õ")
                .combine("N", "Ñ"),
        )
}

#[cfg(feature = "serde")]
fn load_table() -> Result<MappingTable, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(azerty_mac()),
    }
}

#[cfg(not(feature = "serde"))]
fn load_table() -> Result<MappingTable, Box<dyn std::error::Error>> {
    Ok(azerty_mac())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("optmap remap example");
    println!("Hold left Alt for Mac-style characters. Press Ctrl+C to exit\n");

    let table = match load_table() {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Failed to load layout: {}", e);
            std::process::exit(1);
        }
    };
    println!("Layout: {}", table.name);

    let remapper = match Remapper::new(table, Config::default()) {
        Ok(remapper) => remapper,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let handle = remapper.handle();
    ctrlc::set_handler(move || {
        println!("\nStopping...");
        handle.shutdown();
    })
    .expect("Error setting Ctrl-C handler");

    if let Err(e) = remapper.run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
