//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings, so the salt and parameters travel with
//! the hash and verification needs nothing else.

use argon2::{
	password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Algorithm, Argon2, Params, Version,
};

/// Memory cost in KiB.
pub const MEMORY_COST: u32 = 19 * 1024;
pub const ITERATIONS: u32 = 2;
pub const PARALLELISM: u32 = 1;

/// Constructs the hasher used for every password.
pub fn hasher() -> Result<Argon2<'static>, argon2::Error> {
	let params = Params::new(MEMORY_COST, ITERATIONS, PARALLELISM, None)?;

	Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt.
pub fn hash_password(
	hasher: &Argon2,
	password: &str,
) -> Result<String, argon2::password_hash::Error> {
	let salt = SaltString::generate(&mut OsRng);

	Ok(hasher
		.hash_password(password.as_bytes(), &salt)?
		.to_string())
}

/// Returns `true` if `password` matches the stored hash.
///
/// A malformed hash never matches.
pub fn verify_password(hasher: &Argon2, password: &str, hash: &str) -> bool {
	let hash = match PasswordHash::new(hash) {
		Ok(hash) => hash,
		Err(e) => {
			tracing::warn!(error = %e, "stored password hash is malformed");
			return false;
		}
	};

	hasher.verify_password(password.as_bytes(), &hash).is_ok()
}
