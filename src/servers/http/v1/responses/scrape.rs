//! `Scrape` response for the [`HTTP tracker`](crate::servers::http).
//!
//! Builds the bencoded `files` dict keyed by raw 20-byte `info_hash` bytes
//! (§4.1), which cannot use the `ben_dict!` macro since its keys must be
//! `&str`-like.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use privateer_tracker_contrib_bencode::{BDict, BValue};

use crate::core::ScrapeResponse;

/// `Scrape` response for the HTTP tracker, ready to bencode.
#[derive(Debug)]
pub struct Scrape {
    pub data: ScrapeResponse,
}

impl Scrape {
    #[must_use]
    pub fn from_core(data: ScrapeResponse) -> Self {
        Self { data }
    }

    /// Returns the bencoded representation of the scrape response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut files = BDict::new();

        for (info_hash, entry) in &self.data.files {
            let mut file = BDict::new();
            file.insert(b"complete".to_vec(), BValue::Integer(i64::from(entry.seeders)));
            file.insert(b"downloaded".to_vec(), BValue::Integer(i64::from(entry.completed)));
            file.insert(b"incomplete".to_vec(), BValue::Integer(i64::from(entry.leechers)));

            files.insert(info_hash.bytes().to_vec(), BValue::Dict(file));
        }

        let mut dict = BDict::new();
        dict.insert(b"files".to_vec(), BValue::Dict(files));

        BValue::Dict(dict).encode()
    }
}

impl IntoResponse for Scrape {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use privateer_tracker_primitives::info_hash::InfoHash;

    use super::Scrape;
    use crate::core::{ScrapeEntry, ScrapeResponse};

    #[test]
    fn it_bencodes_one_file_entry_per_info_hash() {
        let info_hash = "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap();

        let response = Scrape::from_core(ScrapeResponse {
            files: vec![(
                info_hash,
                ScrapeEntry {
                    seeders: 5,
                    completed: 10,
                    leechers: 2,
                },
            )],
        });

        let body = response.body();
        let decoded = privateer_tracker_contrib_bencode::decode(&body).unwrap();
        let dict = decoded.as_dict().unwrap();
        let files = dict.get(b"files").unwrap().as_dict().unwrap();

        let entry = files.get(&info_hash.bytes()).unwrap().as_dict().unwrap();
        assert_eq!(entry.get(b"complete").unwrap().as_integer().unwrap(), 5);
        assert_eq!(entry.get(b"downloaded").unwrap().as_integer().unwrap(), 10);
        assert_eq!(entry.get(b"incomplete").unwrap().as_integer().unwrap(), 2);
    }

    #[test]
    fn it_bencodes_an_empty_files_dict_when_there_are_no_entries() {
        let response = Scrape::from_core(ScrapeResponse { files: vec![] });

        let body = response.body();
        let decoded = privateer_tracker_contrib_bencode::decode(&body).unwrap();
        let dict = decoded.as_dict().unwrap();
        assert!(dict.get(b"files").unwrap().as_dict().unwrap().is_empty());
    }
}
