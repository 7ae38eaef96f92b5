//! Random customer, card and address data for request payloads.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

const FIRST_NAMES: &[&str] = &[
    "Alice", "Bruno", "Carla", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Kemi", "Lars", "Maya", "Nikhil", "Olga", "Pablo", "Quinn", "Rosa", "Sven", "Tara",
];

const LAST_NAMES: &[&str] = &[
    "Anders", "Baker", "Castillo", "Dubois", "Eriksen", "Fischer", "Garcia", "Haddad", "Ito",
    "Jensen", "Kowalski", "Lopez", "Moreau", "Novak", "Okafor", "Petrov", "Rossi", "Silva",
];

const STREETS: &[&str] = &[
    "Maple Street", "Harbour Road", "Station Lane", "Mill Way", "Church Street", "Park Avenue",
    "Kings Road", "Orchard Close", "River Walk", "High Street",
];

const CITIES: &[&str] = &[
    "Lisbon", "Leeds", "Lyon", "Porto", "Bremen", "Gdansk", "Tampere", "Utrecht", "Graz",
    "Bilbao",
];

const COUNTRIES: &[&str] = &[
    "Portugal", "United Kingdom", "France", "Germany", "Poland", "Finland", "Netherlands",
    "Austria", "Spain",
];

const PASSWORD_CHARS: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789!@#%";

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &'a [&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or("x")
}

/// A simulated customer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

impl Profile {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first_name = pick(rng, FIRST_NAMES).to_string();
        let last_name = pick(rng, LAST_NAMES).to_string();
        let suffix: u32 = rng.gen_range(1000..1_000_000);
        let username = format!(
            "{}{}{}",
            first_name.to_lowercase(),
            &last_name[..1].to_lowercase(),
            suffix
        );
        let email = format!("{}@example.com", username);

        Self {
            first_name,
            last_name,
            username,
            email,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Random password of 10 to 16 characters.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.gen_range(10..=16);
    (0..len)
        .map(|_| PASSWORD_CHARS[rng.gen_range(0..PASSWORD_CHARS.len())] as char)
        .collect()
}

/// Body of `POST /cards`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    pub long_num: String,
    pub expires: String,
    pub ccv: String,
}

impl PaymentCard {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let digits: String = (0..15).map(|_| char::from(b'0' + rng.gen_range(0..10))).collect();
        let long_num = format!("4{}", digits);
        let expires = format!("{:02}/{:02}", rng.gen_range(1..=12), rng.gen_range(27..=36));
        let ccv = format!("{:03}", rng.gen_range(0..1000));

        Self {
            long_num,
            expires,
            ccv,
        }
    }
}

/// Body of `POST /addresses`.
#[derive(Debug, Clone, Serialize)]
pub struct PostalAddress {
    pub number: String,
    pub street: String,
    pub city: String,
    pub postcode: String,
    pub country: String,
}

impl PostalAddress {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            number: rng.gen_range(1..=9999).to_string(),
            street: pick(rng, STREETS).to_string(),
            city: pick(rng, CITIES).to_string(),
            postcode: format!("{:05}", rng.gen_range(0..100_000)),
            country: pick(rng, COUNTRIES).to_string(),
        }
    }
}
