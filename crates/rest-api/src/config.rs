use rand::RngCore;
use serde::{Deserialize, de::{Deserializer, Error, Visitor, Unexpected}};
use std::{fs, fmt, net::{Ipv4Addr, SocketAddr}};

/// Minimal length of a secret key, in bytes.
const MIN_SECRET_LENGTH: usize = 32;

/// API server configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Address on which to listen.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
    /// Domain (host name) of this server.
    pub domain: String,
    /// Secret key, used to seal session cookies.
    #[serde(default = "random_secret", deserialize_with = "de_secret")]
    pub secret: Vec<u8>,
}

/// Default address (127.0.0.1:8080).
fn default_address() -> SocketAddr {
    (Ipv4Addr::LOCALHOST, 8080).into()
}

/// Default secret (32 random bytes).
///
/// Sessions sealed with a random secret don't survive a restart.
fn random_secret() -> Vec<u8> {
    let mut secret = vec![0; MIN_SECRET_LENGTH];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Deserialize a secret key, given either as `base64:<data>` or as
/// `file:<path>`.
fn de_secret<'de, D>(d: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    d.deserialize_byte_buf(SecretVisitor)
}

struct SecretVisitor;

impl<'de> Visitor<'de> for SecretVisitor {
    type Value = Vec<u8>;

    fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "a binary data or a file")
    }

    fn visit_str<E>(self, v: &str) -> Result<Vec<u8>, E>
    where
        E: Error,
    {
        if v.starts_with("base64:") {
            base64::decode(v.trim_start_matches("base64:"))
                .map_err(E::custom)
                .and_then(|v| self.visit_byte_buf(v))
        } else if v.starts_with("file:") {
            fs::read(v.trim_start_matches("file:"))
                .map_err(E::custom)
                .and_then(|v| self.visit_byte_buf(v))
        } else {
            Err(E::invalid_value(
                Unexpected::Str(v), &"an encoded binary string or a file"))
        }
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Vec<u8>, E>
    where
        E: Error,
    {
        if v.len() < MIN_SECRET_LENGTH {
            return Err(E::invalid_length(v.len(), &"at least 32 bytes"));
        }
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: Config = toml::from_str(r#"domain = "localhost""#).unwrap();

        assert_eq!(config.address, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.domain, "localhost");
        assert_eq!(config.secret.len(), MIN_SECRET_LENGTH);
    }

    #[test]
    fn base64_secret() {
        let encoded = base64::encode(&[7u8; 40][..]);
        let config: Config = toml::from_str(&format!(r#"
            address = "0.0.0.0:9000"
            domain = "courses.example.org"
            secret = "base64:{}"
        "#, encoded)).unwrap();

        assert_eq!(config.address.port(), 9000);
        assert_eq!(config.secret, vec![7; 40]);
    }

    #[test]
    fn short_secret_is_rejected() {
        let encoded = base64::encode(b"too short");
        let result = toml::from_str::<Config>(&format!(r#"
            domain = "localhost"
            secret = "base64:{}"
        "#, encoded));

        assert!(result.is_err());
    }

    #[test]
    fn unprefixed_secret_is_rejected() {
        let result = toml::from_str::<Config>(r#"
            domain = "localhost"
            secret = "hunter2"
        "#);

        assert!(result.is_err());
    }
}
