use crate::support::{print_json_or_exit, read_text_or_exit};
use rhomod_term::{CodecError, Value, encode, hex_lower, to_bytes, to_text};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodeOutput {
    rholang: String,
    hex: String,
    length: usize,
}

fn encode_json(text: &str) -> Result<EncodeOutput, String> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
    let render = || -> Result<EncodeOutput, CodecError> {
        let value = Value::from_json(&json)?;
        let par = encode(&value)?;
        let bytes = to_bytes(&par)?;
        Ok(EncodeOutput {
            rholang: to_text(&par)?,
            hex: hex_lower(&bytes),
            length: bytes.len(),
        })
    };
    render().map_err(|e| e.to_string())
}

pub fn run(datafile: String, json_output: bool) {
    let text = read_text_or_exit(&datafile);
    tracing::debug!(file = %datafile, bytes = text.len(), "encoding JSON data");
    let output = encode_json(&text).unwrap_or_else(|e| {
        eprintln!("error: {datafile}: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json_or_exit(&output, "encode");
        return;
    }

    println!("rhomod encode");
    println!("  Rholang: {}", output.rholang);
    println!("  Bytes: {}", output.hex);
    println!("  Length: {}", output.length);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_object_to_canonical_send() {
        let output = encode_json(r#"{"x": "abc"}"#).expect("data should encode");
        assert_eq!(output.rholang, r#"@"x"!("abc")"#);
        assert_eq!(output.hex, "0a0b0a0012072a051a03616263");
        assert_eq!(output.length, 13);
    }

    #[test]
    fn rejects_floats() {
        assert_eq!(
            encode_json("1.5").unwrap_err(),
            "unsupported value kind: fractional number 1.5"
        );
        assert!(encode_json("{").unwrap_err().starts_with("invalid JSON"));
    }
}
