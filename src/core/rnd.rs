//! Random primitives shared by the symbol and XML generators.
//!
//! Every generator draws from one [`Rnd`], so a run started with the same seed
//! replays the same outputs.

use crate::core::regex_gen::{self, RegexOptions};
use crate::utils::error::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use url::Url;

/// ASCII digits, letters, punctuation and whitespace
pub const PRINTABLE: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ\
!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ \t\n\r\u{0b}\u{0c}";

/// PRINTABLE 去掉除空白外的控制字元，可以安全放進 XML
pub const TEXT_CHARS: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ\
!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ ";

const NAME_START: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_";
const NAME_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_-.";
const HOST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const URI_SCHEMES: &[&str] = &["http", "https", "ftp", "file"];
const TLDS: &[&str] = &["com", "org", "net", "io", "test"];

// 2000-01-01T00:00:00Z .. 2038-01-01T00:00:00Z
const DATE_TIME_MIN: i64 = 946_684_800;
const DATE_TIME_MAX: i64 = 2_145_916_800;
const FALLBACK_DATE_TIME: &str = "2014-12-25T00:00:01";

#[derive(Debug, Clone)]
pub struct Rnd {
    rng: StdRng,
    seed: Option<u64>,
}

impl Rnd {
    pub fn from_seed(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, seed }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Uniform float in `[0, 1)`.
    pub fn random(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn coin_flip(&mut self) -> bool {
        self.random() > 0.5
    }

    /// Weibull variate with scale `alpha` and shape `beta`.
    pub fn weibull(&mut self, alpha: f64, beta: f64) -> f64 {
        let u = 1.0 - self.random();
        alpha * (-u.ln()).powf(1.0 / beta)
    }

    /// Exponential variate with rate `lambda`.
    pub fn expovariate(&mut self, lambda: f64) -> f64 {
        -(1.0 - self.random()).ln() / lambda
    }

    /// `int(weibull(alpha, beta))`, used for lengths and counts.
    pub fn weibull_count(&mut self, alpha: f64, beta: f64) -> usize {
        self.weibull(alpha, beta) as usize
    }

    /// Uniform integer in `[a, b]`, both inclusive. Swapped bounds are reordered.
    pub fn randint(&mut self, a: i64, b: i64) -> i64 {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        self.rng.gen_range(low..=high)
    }

    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub fn choice<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// `n` bytes, none of them zero.
    pub fn nonzero_bytes(&mut self, n: usize) -> Vec<u8> {
        (0..n).map(|_| self.rng.gen_range(1..=255u8)).collect()
    }

    pub fn printable(&mut self, n: usize) -> String {
        self.pick_chars(PRINTABLE.as_bytes(), n)
    }

    pub fn text(&mut self) -> String {
        let n = self.weibull_count(20.0, 1.8);
        self.pick_chars(TEXT_CHARS.as_bytes(), n)
    }

    pub fn ncname(&mut self) -> String {
        let len = self.rng.gen_range(1..=16usize);
        let mut name = String::with_capacity(len);
        name.push(NAME_START[self.index(NAME_START.len())] as char);
        name.push_str(&self.pick_chars(NAME_CHARS, len - 1));
        name
    }

    pub fn uri(&mut self) -> String {
        let scheme = URI_SCHEMES[self.index(URI_SCHEMES.len())];
        let segments = self.rng.gen_range(0..=3usize);
        let path: String = (0..segments)
            .map(|_| {
                let len = self.rng.gen_range(1..=8usize);
                format!("/{}", self.pick_chars(HOST_CHARS, len))
            })
            .collect();

        let candidate = if scheme == "file" {
            format!("file://{}", if path.is_empty() { "/" } else { path.as_str() })
        } else {
            let label_len = self.rng.gen_range(1..=12usize);
            let label = self.pick_chars(HOST_CHARS, label_len);
            let tld = TLDS[self.index(TLDS.len())];
            format!("{}://{}.{}{}", scheme, label, tld, path)
        };

        match Url::parse(&candidate) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::warn!("Generated URI '{}' did not parse: {}", candidate, e);
                "http://localhost/".to_string()
            }
        }
    }

    pub fn date_time(&mut self) -> String {
        let secs = self.rng.gen_range(DATE_TIME_MIN..DATE_TIME_MAX);
        chrono::DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_else(|| FALLBACK_DATE_TIME.to_string())
    }

    /// Random string matching `pattern`.
    pub fn regex(&mut self, pattern: &str) -> Result<String> {
        regex_gen::generate(self, pattern, &RegexOptions::default())
    }

    fn pick_chars(&mut self, alphabet: &[u8], n: usize) -> String {
        (0..n)
            .map(|_| alphabet[self.index(alphabet.len())] as char)
            .collect()
    }
}

impl Default for Rnd {
    fn default() -> Self {
        Self::from_seed(None)
    }
}
