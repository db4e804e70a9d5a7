//! Generic infrastructure shared by more than one server or job, with no
//! dependency on the tracker's domain types. Protocol-specific logic
//! (bencode, info_hash, peer primitives) lives in `contrib/bencode` and
//! `packages/primitives` instead, since other crates in the workspace need
//! it too.
