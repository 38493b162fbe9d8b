use fixlen_format::FixedLengthCharset;
use serde_json::json;

use crate::error::Result;

pub fn run(json: bool) -> Result<()> {
    let builtin = FixedLengthCharset::builtin();

    if json {
        let list = builtin
            .iter()
            .map(|c| json!({ "name": c.name(), "bytes_per_character": c.bytes_per_character() }))
            .collect::<Vec<_>>();
        println!("{}", serde_json::Value::from(list));
        return Ok(());
    }

    println!("{:<12}  Bytes", "Charset");
    println!("{}", "-".repeat(19));
    for charset in builtin {
        println!("{:<12}  {:>5}", charset.name(), charset.bytes_per_character());
    }
    println!();
    println!("Any single-byte encoding label (e.g. windows-1252, KOI8-R) is also accepted.");

    Ok(())
}
