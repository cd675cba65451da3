/// Rolling string hash used to derive stable numeric ids.
///
/// Shifts operate on the low 32 bits of the running value, the sum itself is kept whole, so the
/// result can leave the `i32` range. Ids already stored in the database depend on this exact
/// behavior.
#[must_use]
pub fn hash_string(value: &str) -> i64 {
    value.encode_utf16().fold(0_i64, |hash, c| {
        #[allow(clippy::cast_possible_truncation)]
        let low = hash as i32;

        i64::from(c) + i64::from(low.wrapping_shl(6)) + i64::from(low.wrapping_shl(16)) - hash
    })
}

#[cfg(test)]
mod test {
    use super::hash_string;

    #[test]
    fn test_hash_string() {
        assert_eq!(hash_string(""), 0);
        assert_eq!(hash_string("a"), 97);
        assert_eq!(hash_string("Roadblock"), -4_380_063_155);
        assert_eq!(hash_string("Hidden 1"), 6_303_774_331);
        assert_eq!(hash_string("Amphitheatre Nord"), -5_867_405_887);
    }
}
