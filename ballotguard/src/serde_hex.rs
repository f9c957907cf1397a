use crate::group::{ElementModP, ElementModQ};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;

pub use hex_buffer_serde::Hex;

// a single-purpose type for use in `#[serde(with)]`
pub enum ElementModPHex {}

impl Hex<ElementModP> for ElementModPHex {
    type Error = String;

    fn create_bytes(elem: &ElementModP) -> Cow<[u8]> {
        Cow::from(elem.to_bytes())
    }

    fn from_bytes(bytes: &[u8]) -> Result<ElementModP, String> {
        ElementModP::from_bytes_be(bytes).map_err(|e| format!("{}", e))
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum ElementModQHex {}

impl Hex<ElementModQ> for ElementModQHex {
    type Error = String;

    fn create_bytes(elem: &ElementModQ) -> Cow<[u8]> {
        Cow::from(elem.to_bytes())
    }

    fn from_bytes(bytes: &[u8]) -> Result<ElementModQ, String> {
        ElementModQ::from_bytes_be(bytes).map_err(|e| format!("{}", e))
    }
}

/// `#[serde(with)]` for optional nonces, encoded like `ElementModQHex` when present
pub mod option_q_hex {
    use super::*;

    struct Borrowed<'a>(&'a ElementModQ);

    impl<'a> Serialize for Borrowed<'a> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            ElementModQHex::serialize(self.0, serializer)
        }
    }

    struct Owned(ElementModQ);

    impl<'de> Deserialize<'de> for Owned {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            ElementModQHex::deserialize(deserializer).map(Owned)
        }
    }

    pub fn serialize<S: Serializer>(
        elem: &Option<ElementModQ>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        elem.as_ref().map(Borrowed).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<ElementModQ>, D::Error> {
        let owned: Option<Owned> = Option::deserialize(deserializer)?;
        Ok(owned.map(|o| o.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Holder {
        #[serde(with = "ElementModPHex")]
        p: ElementModP,

        #[serde(with = "ElementModQHex")]
        q: ElementModQ,

        #[serde(with = "option_q_hex")]
        nonce: Option<ElementModQ>,
    }

    #[test]
    fn elements_serialize_as_fixed_width_hex() {
        let holder = Holder {
            p: g_pow_p(&ElementModQ::from(3)),
            q: ElementModQ::from(0xff),
            nonce: None,
        };
        let json = serde_json::to_value(&holder).unwrap();
        assert_eq!(json["p"].as_str().unwrap().len(), P_BYTES * 2);
        assert_eq!(json["q"].as_str().unwrap().len(), Q_BYTES * 2);
        assert!(json["q"].as_str().unwrap().ends_with("ff"));
        assert!(json["nonce"].is_null());

        let restored: Holder = serde_json::from_value(json).unwrap();
        assert_eq!(restored, holder);
    }

    #[test]
    fn optional_nonce_follows_the_format() {
        let holder = Holder {
            p: g_pow_p(&ElementModQ::from(5)),
            q: ElementModQ::from(7),
            nonce: Some(ElementModQ::from(0xabcd)),
        };

        let json = serde_json::to_value(&holder).unwrap();
        let nonce_hex = json["nonce"].as_str().unwrap();
        assert_eq!(nonce_hex.len(), Q_BYTES * 2);
        assert!(nonce_hex.ends_with("abcd"));

        // CBOR carries raw byte strings rather than hex text
        let cbor = serde_cbor::to_vec(&holder).unwrap();
        let value: serde_cbor::Value = serde_cbor::from_slice(&cbor).unwrap();
        match value {
            serde_cbor::Value::Map(map) => {
                let nonce = map
                    .get(&serde_cbor::Value::Text("nonce".to_string()))
                    .unwrap();
                match nonce {
                    serde_cbor::Value::Bytes(bytes) => assert_eq!(bytes.len(), Q_BYTES),
                    other => panic!("nonce should be a byte string, got {:?}", other),
                }
            }
            other => panic!("expected a map, got {:?}", other),
        }

        let restored: Holder = serde_cbor::from_slice(&cbor).unwrap();
        assert_eq!(restored, holder);
    }

    #[test]
    fn out_of_range_elements_are_rejected() {
        let too_big = hex::encode(vec![0xffu8; Q_BYTES]);
        let json = format!(
            r#"{{"p": "02", "q": "{}", "nonce": null}}"#,
            too_big
        );
        assert!(serde_json::from_str::<Holder>(&json).is_err());
    }
}
