use internment::Intern;

/// Interned identifier for cheap comparison and hashing
pub type InternedStr = Intern<String>;

/// Intern a string slice
pub fn intern(s: &str) -> InternedStr {
    Intern::new(s.to_owned())
}

/// Intern an owned string
pub fn intern_string(s: String) -> InternedStr {
    Intern::new(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let a = intern("rank2");
        let b = intern_string("rank2".to_owned());
        let c = intern("rank3");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(std::ptr::eq(a.as_ref(), b.as_ref()));
    }
}
