use soroban_sdk::contracttype;

/// Paillier public key. Ciphertexts live in `[1, n²)`, so `n²` must fit in
/// a `u128`; all products are reduced with [`HomomorphicEngine::mul_mod`].
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaillierPublicKey {
    pub n: u128,  // n = p * q
    pub nn: u128, // n^2
    pub g: u128,  // g = n + 1
}

/// Held only by the decryption oracle; never written to contract storage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaillierPrivateKey {
    pub lambda: u128, // lcm(p-1, q-1)
    pub mu: u128,     // lambda^-1 mod n (valid because g = n + 1)
}

impl PaillierPublicKey {
    /// Structural checks only; primality of the factors is the key owner's
    /// responsibility.
    pub fn is_well_formed(&self) -> bool {
        if self.n < 3 {
            return false;
        }
        match self.n.checked_mul(self.n) {
            Some(nn) => nn == self.nn && self.g == self.n + 1,
            None => false,
        }
    }

    /// Largest magnitude that survives the centered decoding in
    /// [`HomomorphicEngine::decrypt`].
    pub fn max_plaintext(&self) -> i128 {
        (self.n / 2) as i128
    }
}

/// Builds a key pair from two distinct primes.
pub fn keypair_from_primes(p: u128, q: u128) -> (PaillierPublicKey, PaillierPrivateKey) {
    let n = p * q;
    let nn = n * n;
    let lambda = lcm(p - 1, q - 1);
    let mu = mod_inverse(lambda % n, n).unwrap_or(0);
    (
        PaillierPublicKey { n, nn, g: n + 1 },
        PaillierPrivateKey { lambda, mu },
    )
}

pub struct HomomorphicEngine;

impl HomomorphicEngine {
    /// c = (g^m * r^n) mod n^2
    ///
    /// `r` must be coprime with `n`; negative plaintexts are carried as
    /// `m mod n`.
    pub fn encrypt(pub_key: &PaillierPublicKey, m: i128, r: u128) -> u128 {
        let gm = Self::pow_mod(pub_key.g, Self::encode(pub_key, m), pub_key.nn);
        let rn = Self::pow_mod(r, pub_key.n, pub_key.nn);
        Self::mul_mod(gm, rn, pub_key.nn)
    }

    /// Deterministic encryption with `r = 1`. Used for public constants such
    /// as the zero an accumulator starts from.
    pub fn encrypt_trivial(pub_key: &PaillierPublicKey, m: i128) -> u128 {
        Self::pow_mod(pub_key.g, Self::encode(pub_key, m), pub_key.nn)
    }

    /// m = L(c^lambda mod n^2) * mu mod n, lifted to the centered range
    /// `(-n/2, n/2]`.
    pub fn decrypt(pub_key: &PaillierPublicKey, priv_key: &PaillierPrivateKey, c: u128) -> i128 {
        let n = pub_key.n;
        let nn = pub_key.nn;

        // L(u) = (u - 1) / n
        let u = Self::pow_mod(c, priv_key.lambda, nn);
        let l_u = u.saturating_sub(1) / n;

        Self::decode(pub_key, Self::mul_mod(l_u, priv_key.mu, n))
    }

    /// Additive property: E(m1 + m2) = E(m1) * E(m2) mod n^2
    pub fn add_ciphertexts(pub_key: &PaillierPublicKey, c1: u128, c2: u128) -> u128 {
        Self::mul_mod(c1, c2, pub_key.nn)
    }

    /// Scalar property: E(m * k) = E(m)^k mod n^2
    pub fn mul_plaintext(pub_key: &PaillierPublicKey, c: u128, k: i128) -> u128 {
        Self::pow_mod(c, Self::encode(pub_key, k), pub_key.nn)
    }

    pub fn is_valid_ciphertext(pub_key: &PaillierPublicKey, c: u128) -> bool {
        c > 0 && c < pub_key.nn && gcd(c % pub_key.n, pub_key.n) == 1
    }

    fn encode(pub_key: &PaillierPublicKey, m: i128) -> u128 {
        m.rem_euclid(pub_key.n as i128) as u128
    }

    fn decode(pub_key: &PaillierPublicKey, m: u128) -> i128 {
        if m > pub_key.n / 2 {
            m as i128 - pub_key.n as i128
        } else {
            m as i128
        }
    }

    /// (a * b) mod m without overflowing `u128`.
    pub fn mul_mod(a: u128, b: u128, m: u128) -> u128 {
        let mut a = a % m;
        let mut b = b % m;
        if let Some(product) = a.checked_mul(b) {
            return product % m;
        }
        let mut res = 0u128;
        while b > 0 {
            if b & 1 == 1 {
                res = add_mod(res, a, m);
            }
            a = add_mod(a, a, m);
            b >>= 1;
        }
        res
    }

    pub fn pow_mod(mut base: u128, mut exp: u128, mod_val: u128) -> u128 {
        if mod_val == 1 {
            return 0;
        }
        let mut res = 1u128;
        base %= mod_val;
        while exp > 0 {
            if exp & 1 == 1 {
                res = Self::mul_mod(res, base, mod_val);
            }
            base = Self::mul_mod(base, base, mod_val);
            exp >>= 1;
        }
        res
    }
}

fn add_mod(a: u128, b: u128, m: u128) -> u128 {
    let (sum, overflow) = a.overflowing_add(b);
    if overflow || sum >= m {
        sum.wrapping_sub(m)
    } else {
        sum
    }
}

pub fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

fn lcm(a: u128, b: u128) -> u128 {
    a / gcd(a, b) * b
}

/// Extended Euclid. `m` must be below 2^126 so the signed coefficients fit.
fn mod_inverse(a: u128, m: u128) -> Option<u128> {
    let (mut old_r, mut r) = (a as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u128)
}
