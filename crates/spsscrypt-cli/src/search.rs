//! Password search for `spsscrypt decrypt --password-list` and `-a/-l`

use anyhow::{bail, Result};
use rayon::prelude::*;
use spsscrypt_reader::PasswordProbe;

/// Expand an alphabet spec: `a-z` ranges are expanded, other bytes kept.
pub fn expand_alphabet(spec: &str) -> Vec<u8> {
    let bytes = spec.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if i + 2 < bytes.len() && bytes[i + 1] == b'-' && bytes[i + 2] > bytes[i] {
            out.extend(bytes[i]..=bytes[i + 2]);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// Every password of one length over an alphabet, first character varying
/// fastest.
#[derive(Debug, Clone)]
pub struct Odometer<'a> {
    alphabet: &'a [u8],
    indexes: Vec<usize>,
    done: bool,
}

impl<'a> Odometer<'a> {
    /// Start at the first password of length `len`.
    pub fn new(alphabet: &'a [u8], len: usize) -> Self {
        Self {
            alphabet,
            indexes: vec![0; len],
            done: alphabet.is_empty() && len > 0,
        }
    }

    /// Start at `start`, which must consist of alphabet characters.
    pub fn starting_at(alphabet: &'a [u8], start: &[u8]) -> Result<Self> {
        let mut indexes = Vec::with_capacity(start.len());
        for &c in start {
            let Some(i) = alphabet.iter().position(|&a| a == c) else {
                bail!(
                    "{}: '{}' is not in alphabet",
                    start.escape_ascii(),
                    c.escape_ascii()
                );
            };
            indexes.push(i);
        }
        Ok(Self {
            alphabet,
            indexes,
            done: false,
        })
    }

    fn current(&self) -> Vec<u8> {
        self.indexes.iter().map(|&i| self.alphabet[i]).collect()
    }

    fn advance(&mut self) {
        for index in &mut self.indexes {
            *index += 1;
            if *index < self.alphabet.len() {
                return;
            }
            *index = 0;
        }
        self.done = true;
    }
}

impl Iterator for Odometer<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        if self.done {
            return None;
        }
        let pw = self.current();
        self.advance();
        Some(pw)
    }
}

/// All candidates from `start` (or the empty password) up to `max_length`.
pub fn brute_force<'a>(
    alphabet: &'a [u8],
    start: Option<&[u8]>,
    max_length: usize,
) -> Result<impl Iterator<Item = Vec<u8>> + 'a> {
    let first_len = start.map_or(0, <[u8]>::len);
    let first = match start {
        Some(start) => Odometer::starting_at(alphabet, start)?,
        None => Odometer::new(alphabet, 0),
    };
    let rest = (first_len + 1..=max_length).flat_map(move |len| Odometer::new(alphabet, len));
    Ok(first.take_while(move |_| first_len <= max_length).chain(rest))
}

/// Number of candidates from the empty password up to `max_length`, if it fits.
pub fn brute_force_total(alphabet_len: usize, max_length: usize) -> Option<u64> {
    let base = u64::try_from(alphabet_len).ok()?;
    (0..=max_length).try_fold(0u64, |total, len| {
        total.checked_add(base.checked_pow(u32::try_from(len).ok()?)?)
    })
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Candidates tested between progress reports.
    pub batch: usize,
    pub parallel: bool,
}

/// Test candidates in order and return the first literal password that
/// unlocks the file.
///
/// Candidates are taken in batches; `progress` is called before each batch
/// with the number already tried and the first candidate of the batch.
/// Within a batch the earliest match wins, also when testing in parallel.
pub fn find_password<I>(
    probe: &PasswordProbe,
    candidates: I,
    options: SearchOptions,
    mut progress: impl FnMut(u64, &[u8]),
) -> Result<Option<Vec<u8>>>
where
    I: IntoIterator<Item = Result<Vec<u8>>>,
{
    let mut candidates = candidates.into_iter();
    let batch_size = options.batch.max(1);
    let mut batch = Vec::with_capacity(batch_size.min(1 << 16));
    let mut tried = 0u64;

    loop {
        batch.clear();
        for candidate in candidates.by_ref().take(batch_size) {
            batch.push(candidate?);
        }
        let Some(first) = batch.first() else {
            return Ok(None);
        };
        progress(tried, first);

        let found = if options.parallel {
            batch.par_iter().find_first(|pw| probe.try_password(pw))
        } else {
            batch.iter().find(|pw| probe.try_password(pw))
        };
        if let Some(pw) = found {
            return Ok(Some(pw.clone()));
        }
        tried += batch.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spsscrypt_reader::{EncryptedFile, FileType, Magic};
    use spsscrypt_testkit::{encrypt_container, sample_payload};
    use std::io::Cursor;

    fn probe_for(password: &[u8]) -> PasswordProbe {
        let bytes = encrypt_container(password, &sample_payload(Magic::SystemV2, 64), FileType::Data);
        EncryptedFile::new(Cursor::new(bytes), "t").unwrap().probe()
    }

    fn strings<I: Iterator<Item = Vec<u8>>>(iter: I) -> Vec<String> {
        iter.map(|v| String::from_utf8(v).unwrap()).collect()
    }

    #[test]
    fn test_expand_alphabet() {
        assert_eq!(expand_alphabet("a-e"), b"abcde");
        assert_eq!(expand_alphabet("0-3xy"), b"0123xy");
        assert_eq!(expand_alphabet("z-a"), b"z-a");
        assert_eq!(expand_alphabet("a-"), b"a-");
        assert_eq!(expand_alphabet("-"), b"-");
    }

    #[test]
    fn test_odometer_order() {
        let got = strings(Odometer::new(b"ab", 2));
        assert_eq!(got, ["aa", "ba", "ab", "bb"]);
        assert_eq!(strings(Odometer::new(b"ab", 0)), [""]);
    }

    #[test]
    fn test_odometer_start() {
        let got = strings(Odometer::starting_at(b"abc", b"bc").unwrap());
        assert_eq!(got, ["bc", "cc"]);
        assert!(Odometer::starting_at(b"abc", b"ad").is_err());
    }

    #[test]
    fn test_brute_force_sequence() {
        let got = strings(brute_force(b"01", None, 2).unwrap());
        assert_eq!(got, ["", "0", "1", "00", "10", "01", "11"]);

        let got = strings(brute_force(b"01", Some(b"1"), 2).unwrap());
        assert_eq!(got, ["1", "00", "10", "01", "11"]);

        assert_eq!(brute_force(b"01", Some(b"111"), 2).unwrap().count(), 0);
    }

    #[test]
    fn test_brute_force_total() {
        assert_eq!(brute_force_total(2, 2), Some(7));
        assert_eq!(brute_force_total(36, 0), Some(1));
        assert_eq!(brute_force_total(256, 10), None);
    }

    #[test]
    fn test_find_password_serial_and_parallel() {
        let probe = probe_for(b"cab");
        for parallel in [false, true] {
            let mut reports = Vec::new();
            let found = find_password(
                &probe,
                brute_force(b"abc", None, 3).unwrap().map(Ok),
                SearchOptions { batch: 5, parallel },
                |tried, _| reports.push(tried),
            )
            .unwrap();
            assert_eq!(found.as_deref(), Some(&b"cab"[..]));
            assert_eq!(reports[..3], [0, 5, 10]);
        }
    }

    #[test]
    fn test_find_password_exhausted() {
        let probe = probe_for(b"zzzz");
        let found = find_password(
            &probe,
            brute_force(b"ab", None, 2).unwrap().map(Ok),
            SearchOptions { batch: 100_000, parallel: true },
            |_, _| {},
        )
        .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_find_password_propagates_errors() {
        let probe = probe_for(b"x");
        let candidates = vec![Ok(b"a".to_vec()), Err(anyhow::anyhow!("broken list"))];
        let err = find_password(
            &probe,
            candidates,
            SearchOptions { batch: 10, parallel: false },
            |_, _| {},
        )
        .unwrap_err();
        assert!(err.to_string().contains("broken list"));
    }
}
