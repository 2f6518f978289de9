use std::cmp::Ordering;

use super::Wide128;

/// 32-bit word count of the kernel.
const NW: usize = 4;

/// Maps a significance index (0 = least significant word) to the physical
/// array index. The portable encoding keeps words in the host's byte order so
/// that a stored significand can be overlaid on memory without swizzling.
#[cfg(target_endian = "little")]
#[inline]
const fn wx(i: usize) -> usize {
    i
}

/// Maps a significance index (0 = least significant word) to the physical
/// array index.
#[cfg(target_endian = "big")]
#[inline]
const fn wx(i: usize) -> usize {
    NW - 1 - i
}

/// 32-bit word-array kernel for targets without efficient 64-bit integer
/// arithmetic. Selected as [`super::Sig128`] by the `portable` feature and
/// compiled (and tested against [`super::NativeWide128`]) unconditionally.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct WordWide128(pub [u32; NW]);

impl WordWide128 {
    #[inline]
    fn word(self, i: usize) -> u32 {
        self.0[wx(i)]
    }

    #[inline]
    fn set_word(&mut self, i: usize, v: u32) {
        self.0[wx(i)] = v;
    }

    fn from_words_lsf(words: [u32; NW]) -> Self {
        let mut z = Self::ZERO;
        for (i, w) in words.into_iter().enumerate() {
            z.set_word(i, w);
        }
        z
    }

    /// Schoolbook product of two word arrays, least significant first.
    fn mul_words(a: &[u32], b: &[u32]) -> [u32; 2 * NW] {
        let mut acc = [0u32; 2 * NW];
        for (i, &aw) in a.iter().enumerate() {
            let mut carry = 0u64;
            for (j, &bw) in b.iter().enumerate() {
                let t = u64::from(aw) * u64::from(bw) + u64::from(acc[i + j]) + carry;
                acc[i + j] = t as u32;
                carry = t >> 32;
            }
            acc[i + b.len()] = carry as u32;
        }
        acc
    }
}

impl Wide128 for WordWide128 {
    const ZERO: Self = Self([0; NW]);
    #[cfg(target_endian = "little")]
    const ONE: Self = Self([1, 0, 0, 0]);
    #[cfg(target_endian = "big")]
    const ONE: Self = Self([0, 0, 0, 1]);

    fn from_halves(hi: u64, lo: u64) -> Self {
        Self::from_words_lsf([lo as u32, (lo >> 32) as u32, hi as u32, (hi >> 32) as u32])
    }

    fn hi(self) -> u64 {
        u64::from(self.word(2)) | (u64::from(self.word(3)) << 32)
    }

    fn lo(self) -> u64 {
        u64::from(self.word(0)) | (u64::from(self.word(1)) << 32)
    }

    fn add(self, rhs: Self) -> Self {
        let mut z = Self::ZERO;
        let mut carry = 0u64;
        for i in 0..NW {
            let t = u64::from(self.word(i)) + u64::from(rhs.word(i)) + carry;
            z.set_word(i, t as u32);
            carry = t >> 32;
        }
        z
    }

    fn sub(self, rhs: Self) -> Self {
        let mut z = Self::ZERO;
        let mut borrow = 0i64;
        for i in 0..NW {
            let t = i64::from(self.word(i)) - i64::from(rhs.word(i)) - borrow;
            z.set_word(i, t as u32);
            borrow = i64::from(t < 0);
        }
        z
    }

    fn cmp_mag(self, rhs: Self) -> Ordering {
        for i in (0..NW).rev() {
            match self.word(i).cmp(&rhs.word(i)) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        Ordering::Equal
    }

    fn shl(self, dist: u32) -> Self {
        debug_assert!(dist < 128);
        let word_shift = (dist / 32) as usize;
        let bit_shift = dist % 32;
        let mut z = Self::ZERO;
        for i in (word_shift..NW).rev() {
            let mut w = self.word(i - word_shift) << bit_shift;
            if bit_shift != 0 && i - word_shift > 0 {
                w |= self.word(i - word_shift - 1) >> (32 - bit_shift);
            }
            z.set_word(i, w);
        }
        z
    }

    fn shr(self, dist: u32) -> Self {
        debug_assert!(dist < 128);
        let word_shift = (dist / 32) as usize;
        let bit_shift = dist % 32;
        let mut z = Self::ZERO;
        for i in 0..NW - word_shift {
            let mut w = self.word(i + word_shift) >> bit_shift;
            if bit_shift != 0 && i + word_shift + 1 < NW {
                w |= self.word(i + word_shift + 1) << (32 - bit_shift);
            }
            z.set_word(i, w);
        }
        z
    }

    fn shr_jam(self, dist: u32) -> Self {
        if dist == 0 {
            return self;
        }
        if dist >= 128 {
            return if self.is_zero() { Self::ZERO } else { Self::ONE };
        }
        let mut z = self.shr(dist);
        // Sticky: any bit below the shift distance survives as the low bit.
        let word_shift = (dist / 32) as usize;
        let bit_shift = dist % 32;
        let mut lost = self.word(word_shift) & !(u32::MAX.checked_shl(bit_shift).unwrap_or(0));
        if bit_shift == 0 {
            lost = 0;
        }
        for i in 0..word_shift {
            lost |= self.word(i);
        }
        if lost != 0 {
            z.set_word(0, z.word(0) | 1);
        }
        z
    }

    fn leading_zeros(self) -> u32 {
        for i in (0..NW).rev() {
            let w = self.word(i);
            if w != 0 {
                return (NW - 1 - i) as u32 * 32 + w.leading_zeros();
            }
        }
        128
    }

    fn mul_64(a: u64, b: u64) -> Self {
        let aw = [a as u32, (a >> 32) as u32];
        let bw = [b as u32, (b >> 32) as u32];
        let mut acc = [0u32; NW];
        for (i, &x) in aw.iter().enumerate() {
            let mut carry = 0u64;
            for (j, &y) in bw.iter().enumerate() {
                let t = u64::from(x) * u64::from(y) + u64::from(acc[i + j]) + carry;
                acc[i + j] = t as u32;
                carry = t >> 32;
            }
            acc[i + 2] = carry as u32;
        }
        Self::from_words_lsf(acc)
    }

    fn widening_mul(self, rhs: Self) -> (Self, Self) {
        let a: [u32; NW] = std::array::from_fn(|i| self.word(i));
        let b: [u32; NW] = std::array::from_fn(|i| rhs.word(i));
        let acc = Self::mul_words(&a, &b);
        let lo = Self::from_words_lsf([acc[0], acc[1], acc[2], acc[3]]);
        let hi = Self::from_words_lsf([acc[4], acc[5], acc[6], acc[7]]);
        (hi, lo)
    }
}
