//! Shamir secret sharing over GF(256) (spec.md §4.1).
//!
//! `split` divides a byte string into `n` shares with threshold `k`;
//! `combine` reassembles any `k` of them via Lagrange interpolation at `x=0`.
//! With fewer than `k` shares, `combine` returns uniformly-random garbage —
//! that is intrinsic to the scheme, not a bug; callers must obtain `k` from
//! policy, never infer it from the shares on hand.

pub mod error;
pub mod gf256;

pub use error::SssError;

use airgapper_core::Share;
use rand::RngCore;

/// Split `secret` into `n` shares, any `k` of which reconstruct it.
///
/// Preconditions: `k >= 2`, `k <= n`, `n <= 255`, `secret` non-empty.
pub fn split(secret: &[u8], k: u8, n: u8) -> Result<Vec<Share>, SssError> {
    if k < 2 {
        return Err(SssError::InvalidParameter(format!("threshold k must be >= 2, got {k}")));
    }
    if k > n {
        return Err(SssError::InvalidParameter(format!("threshold k ({k}) must be <= total shares n ({n})")));
    }
    if secret.is_empty() {
        return Err(SssError::InvalidParameter("secret must be non-empty".into()));
    }
    // n <= 255 is already guaranteed by n: u8.

    let mut shares: Vec<Share> = (1..=n)
        .map(|i| Share {
            index: i,
            data: Vec::with_capacity(secret.len()),
        })
        .collect();

    let mut rng = rand::rngs::OsRng;
    let mut coeffs = vec![0u8; k as usize];
    for &byte in secret {
        coeffs[0] = byte;
        rng.fill_bytes(&mut coeffs[1..]);
        for share in shares.iter_mut() {
            let y = gf256::eval_poly(&coeffs, share.index);
            share.data.push(y);
        }
    }
    use zeroize::Zeroize;
    coeffs.zeroize();

    Ok(shares)
}

/// Reconstruct the original secret from at least 2 shares via Lagrange
/// interpolation at `x = 0`. All shares must share the same length and have
/// distinct indices.
pub fn combine(shares: &[Share]) -> Result<Vec<u8>, SssError> {
    if shares.len() < 2 {
        return Err(SssError::InvalidParameter(format!(
            "need at least 2 shares to combine, got {}",
            shares.len()
        )));
    }
    let len = shares[0].data.len();
    if shares.iter().any(|s| s.data.len() != len) {
        return Err(SssError::InvalidParameter("all shares must have the same length".into()));
    }
    let mut indexes: Vec<u8> = shares.iter().map(|s| s.index).collect();
    indexes.sort_unstable();
    indexes.dedup();
    if indexes.len() != shares.len() {
        return Err(SssError::InvalidParameter("shares must have distinct indices".into()));
    }

    let mut secret = Vec::with_capacity(len);
    for byte_idx in 0..len {
        let mut value = 0u8;
        for (i, si) in shares.iter().enumerate() {
            let xi = si.index;
            let yi = si.data[byte_idx];

            // Lagrange basis L_i(0) = product over j != i of xj / (xi XOR xj).
            let mut basis = 1u8;
            for (j, sj) in shares.iter().enumerate() {
                if i == j {
                    continue;
                }
                let xj = sj.index;
                let num = xj;
                let den = xi ^ xj;
                basis = gf256::mul(basis, gf256::mul(num, gf256::inv(den)));
            }
            value ^= gf256::mul(yi, basis);
        }
        secret.push(value);
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(shares: &[Share], indexes: &[usize]) -> Vec<Share> {
        indexes
            .iter()
            .map(|&i| Share {
                index: shares[i].index,
                data: shares[i].data.clone(),
            })
            .collect()
    }

    #[test]
    fn round_trip_2_of_2() {
        let secret = b"the quick brown fox";
        let shares = split(secret, 2, 2).unwrap();
        let recovered = combine(&subset(&shares, &[0, 1])).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn round_trip_2_of_4_any_subset() {
        let secret = b"lost files, need restore";
        let shares = split(secret, 2, 4).unwrap();
        assert_eq!(combine(&subset(&shares, &[0, 1])).unwrap(), secret);
        assert_eq!(combine(&subset(&shares, &[1, 3])).unwrap(), secret);
        assert_eq!(combine(&subset(&shares, &[2, 3])).unwrap(), secret);
    }

    #[test]
    fn round_trip_3_of_5() {
        let secret = b"Hello Secret Sharing World!";
        let shares = split(secret, 3, 5).unwrap();
        assert_eq!(combine(&subset(&shares, &[0, 1, 2])).unwrap(), secret);
        assert_eq!(combine(&subset(&shares, &[2, 3, 4])).unwrap(), secret);
        assert_eq!(combine(&shares).unwrap(), secret);
    }

    #[test]
    fn round_trip_all_zero_secret() {
        let secret = vec![0u8; 32];
        let shares = split(&secret, 2, 3).unwrap();
        assert_eq!(combine(&subset(&shares, &[0, 2])).unwrap(), secret);
    }

    #[test]
    fn round_trip_all_0xff_secret() {
        let secret = vec![0xffu8; 32];
        let shares = split(&secret, 4, 7).unwrap();
        assert_eq!(combine(&subset(&shares, &[1, 2, 3, 5])).unwrap(), secret);
    }

    #[test]
    fn round_trip_max_shares() {
        // k=2, n=255 exercises the upper bound on share count.
        let secret = b"max shares";
        let shares = split(secret, 2, 255).unwrap();
        assert_eq!(shares.len(), 255);
        assert_eq!(combine(&subset(&shares, &[0, 254])).unwrap(), secret);
    }

    #[test]
    fn combine_with_one_share_fails() {
        let secret = b"test";
        let shares = split(secret, 3, 5).unwrap();
        assert!(combine(&subset(&shares, &[0])).is_err());
    }

    #[test]
    fn split_rejects_k_less_than_2() {
        assert!(split(b"x", 1, 5).is_err());
    }

    #[test]
    fn split_rejects_k_greater_than_n() {
        assert!(split(b"x", 6, 5).is_err());
    }

    #[test]
    fn split_rejects_empty_secret() {
        assert!(split(b"", 2, 3).is_err());
    }

    #[test]
    fn combine_rejects_mismatched_lengths() {
        let mut shares = split(b"abcdefgh", 2, 3).unwrap();
        shares[0].data.pop();
        assert!(combine(&shares[..2]).is_err());
    }

    #[test]
    fn combine_rejects_duplicate_indices() {
        let shares = split(b"abcdefgh", 2, 3).unwrap();
        let dup = vec![
            Share { index: shares[0].index, data: shares[0].data.clone() },
            Share { index: shares[0].index, data: shares[0].data.clone() },
        ];
        assert!(combine(&dup).is_err());
    }

    #[test]
    fn different_splits_produce_independent_shares() {
        // With fresh randomness, two splits of the same secret produce
        // byte-distinct shares at the same index (overwhelmingly likely).
        let secret = b"identical secret, different polynomials";
        let a = split(secret, 2, 2).unwrap();
        let b = split(secret, 2, 2).unwrap();
        assert_ne!(a[0].data, b[0].data);
    }
}
