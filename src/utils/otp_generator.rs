// utils/otp_generator.rs
use rand::Rng;

/// Short numeric code handed out when a professional marks cash as received.
pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(100000..999999))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
