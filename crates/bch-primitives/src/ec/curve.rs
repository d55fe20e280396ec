//! secp256k1 point arithmetic.
//!
//! Points are exposed in affine form. Addition chains inside scalar
//! multiplication run in Jacobian coordinates so that only one field
//! inversion is paid per multiplication.
//!
//! The curve is `y² = x³ + 7` over the prime field `P`, with generator `G`
//! of prime order `N`.

use std::sync::OnceLock;

use crate::bn::{BigNumber, Endian};
use crate::PrimitivesError;

const P_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];
const N_BYTES: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b,
    0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];
const GX_BYTES: [u8; 32] = [
    0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac,
    0x55, 0xa0, 0x62, 0x95, 0xce, 0x87, 0x0b, 0x07,
    0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9,
    0x59, 0xf2, 0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98,
];
const GY_BYTES: [u8; 32] = [
    0x48, 0x3a, 0xda, 0x77, 0x26, 0xa3, 0xc4, 0x65,
    0x5d, 0xa4, 0xfb, 0xfc, 0x0e, 0x11, 0x08, 0xa8,
    0xfd, 0x17, 0xb4, 0x48, 0xa6, 0x85, 0x54, 0x19,
    0x9c, 0x47, 0xd0, 0x8f, 0xfb, 0x10, 0xd4, 0xb8,
];

struct CurveParams {
    p: BigNumber,
    n: BigNumber,
    half_n: BigNumber,
    b: BigNumber,
    sqrt_exp: BigNumber,
    g: Point,
}

fn params() -> &'static CurveParams {
    static PARAMS: OnceLock<CurveParams> = OnceLock::new();
    PARAMS.get_or_init(|| {
        let be = |b: &[u8; 32]| BigNumber::from_bytes(b, Endian::Big);
        let p = be(&P_BYTES);
        let n = be(&N_BYTES);
        let half_n = n.shr(1);
        let sqrt_exp = p.add(&BigNumber::one()).shr(2);
        let g = Point::Affine {
            x: be(&GX_BYTES),
            y: be(&GY_BYTES),
        };
        CurveParams {
            p,
            n,
            half_n,
            b: BigNumber::from(7u64),
            sqrt_exp,
            g,
        }
    })
}

/// The field prime `P`.
pub fn p() -> &'static BigNumber {
    &params().p
}

/// The group order `N`.
pub fn n() -> &'static BigNumber {
    &params().n
}

/// `N / 2`, the upper bound for a low-S signature component.
pub fn half_n() -> &'static BigNumber {
    &params().half_n
}

/// The generator point `G`.
pub fn g() -> &'static Point {
    &params().g
}

// ---------------------------------------------------------------------------
// Field helpers (mod P)
// ---------------------------------------------------------------------------

fn fmul(a: &BigNumber, b: &BigNumber) -> BigNumber {
    a.mul_mod(b, p())
}

fn fsqr(a: &BigNumber) -> BigNumber {
    a.mul_mod(a, p())
}

fn fadd(a: &BigNumber, b: &BigNumber) -> BigNumber {
    a.add_mod(b, p())
}

fn fsub(a: &BigNumber, b: &BigNumber) -> BigNumber {
    a.sub_mod(b, p())
}

fn fsmall(k: u64, a: &BigNumber) -> BigNumber {
    a.mul_mod(&BigNumber::from(k), p())
}

/// Right-hand side of the curve equation, `x³ + 7 mod P`.
fn curve_rhs(x: &BigNumber) -> BigNumber {
    fadd(&fmul(&fsqr(x), x), &params().b)
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A point on secp256k1 in affine coordinates, or the point at infinity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Point {
    /// The identity element.
    Infinity,
    /// A finite point `(x, y)` with both coordinates in `[0, P)`.
    Affine { x: BigNumber, y: BigNumber },
}

impl Point {
    /// Build a point from coordinates, checking the curve equation.
    ///
    /// # Returns
    /// The point, or `InvalidPoint` if `(x, y)` is not on the curve.
    pub fn new(x: BigNumber, y: BigNumber) -> Result<Point, PrimitivesError> {
        let pt = Point::Affine { x, y };
        pt.validate()?;
        Ok(pt)
    }

    /// Recover the point with x-coordinate `x` and the requested y parity.
    ///
    /// # Arguments
    /// * `is_odd` - Whether the returned point's y-coordinate is odd.
    /// * `x` - Candidate x-coordinate.
    ///
    /// # Returns
    /// The unique matching point, or `InvalidPoint` if `x` is outside the
    /// field or `x³ + 7` has no square root mod `P`.
    pub fn from_x(is_odd: bool, x: &BigNumber) -> Result<Point, PrimitivesError> {
        if x.is_negative() || x >= p() {
            return Err(PrimitivesError::InvalidPoint(
                "x coordinate outside the field".to_string(),
            ));
        }
        let rhs = curve_rhs(x);
        let mut y = rhs.pow_mod(&params().sqrt_exp, p());
        if fsqr(&y) != rhs {
            return Err(PrimitivesError::InvalidPoint(format!(
                "no curve point with x = {}",
                x
            )));
        }
        if y.is_odd() != is_odd {
            y = p().sub(&y);
        }
        Ok(Point::Affine { x: x.clone(), y })
    }

    /// Decode a SEC1 compressed (`02`/`03 ‖ x`) or uncompressed
    /// (`04 ‖ x ‖ y`) encoding. The decoded point is always validated.
    pub fn from_sec1(bytes: &[u8]) -> Result<Point, PrimitivesError> {
        match (bytes.first(), bytes.len()) {
            (Some(prefix @ (0x02 | 0x03)), 33) => {
                let x = BigNumber::from_bytes(&bytes[1..], Endian::Big);
                Point::from_x(*prefix == 0x03, &x)
            }
            (Some(0x04), 65) => {
                let x = BigNumber::from_bytes(&bytes[1..33], Endian::Big);
                let y = BigNumber::from_bytes(&bytes[33..], Endian::Big);
                Point::new(x, y)
            }
            (Some(prefix), len) => Err(PrimitivesError::InvalidPoint(format!(
                "unsupported encoding: prefix 0x{:02x}, length {}",
                prefix, len
            ))),
            (None, _) => Err(PrimitivesError::InvalidPoint("empty encoding".to_string())),
        }
    }

    /// Encode as SEC1 bytes. Fails for the point at infinity.
    pub fn to_sec1(&self, compressed: bool) -> Result<Vec<u8>, PrimitivesError> {
        let (x, y) = self.coords()?;
        let xb = x.to_bytes(32, Endian::Big)?;
        if compressed {
            let mut out = Vec::with_capacity(33);
            out.push(if y.is_odd() { 0x03 } else { 0x02 });
            out.extend_from_slice(&xb);
            Ok(out)
        } else {
            let mut out = Vec::with_capacity(65);
            out.push(0x04);
            out.extend_from_slice(&xb);
            out.extend_from_slice(&y.to_bytes(32, Endian::Big)?);
            Ok(out)
        }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// The x-coordinate, or `None` at infinity.
    pub fn x(&self) -> Option<&BigNumber> {
        match self {
            Point::Affine { x, .. } => Some(x),
            Point::Infinity => None,
        }
    }

    /// The y-coordinate, or `None` at infinity.
    pub fn y(&self) -> Option<&BigNumber> {
        match self {
            Point::Affine { y, .. } => Some(y),
            Point::Infinity => None,
        }
    }

    fn coords(&self) -> Result<(&BigNumber, &BigNumber), PrimitivesError> {
        match self {
            Point::Affine { x, y } => Ok((x, y)),
            Point::Infinity => Err(PrimitivesError::InvalidPoint(
                "point at infinity".to_string(),
            )),
        }
    }

    /// Check that the point is a finite point satisfying `y² = x³ + 7`.
    ///
    /// Run this on every point built from external bytes before trusting it.
    pub fn validate(&self) -> Result<(), PrimitivesError> {
        let (x, y) = self.coords()?;
        let in_field = |v: &BigNumber| !v.is_negative() && v < p();
        if !in_field(x) || !in_field(y) {
            return Err(PrimitivesError::InvalidPoint(
                "coordinate outside the field".to_string(),
            ));
        }
        if fsqr(y) != curve_rhs(x) {
            return Err(PrimitivesError::InvalidPoint(
                "point does not satisfy the curve equation".to_string(),
            ));
        }
        Ok(())
    }

    /// The additive inverse `(x, -y)`.
    pub fn negate(&self) -> Point {
        match self {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: p().sub(y).umod(p()),
            },
        }
    }

    /// Group addition `self + other`.
    pub fn add(&self, other: &Point) -> Point {
        Jacobian::from(self).add(&Jacobian::from(other)).to_affine()
    }

    /// Point doubling `2 · self`.
    pub fn double(&self) -> Point {
        Jacobian::from(self).double().to_affine()
    }

    /// Scalar multiplication `k · self`.
    ///
    /// The scalar is not reduced mod `N`, so `N · R` is computed exactly and
    /// yields infinity for points of order `N`. `k = 0` gives infinity and a
    /// negative `k` multiplies the negated point.
    pub fn mul(&self, k: &BigNumber) -> Point {
        if k.is_negative() {
            return self.negate().mul(&k.neg());
        }
        let base = Jacobian::from(self);
        let mut acc = Jacobian::infinity();
        for i in (0..k.bit_len()).rev() {
            acc = acc.double();
            if k.bit(i) {
                acc = acc.add(&base);
            }
        }
        acc.to_affine()
    }

    /// Compute `u1 · G + u2 · q` with a single interleaved ladder.
    ///
    /// Both scalars must be non-negative; callers pass values reduced mod `N`.
    pub fn mul_add(u1: &BigNumber, u2: &BigNumber, q: &Point) -> Point {
        let gj = Jacobian::from(g());
        let qj = Jacobian::from(q);
        let both = gj.add(&qj);
        let bits = u1.bit_len().max(u2.bit_len());
        let mut acc = Jacobian::infinity();
        for i in (0..bits).rev() {
            acc = acc.double();
            match (u1.bit(i), u2.bit(i)) {
                (true, true) => acc = acc.add(&both),
                (true, false) => acc = acc.add(&gj),
                (false, true) => acc = acc.add(&qj),
                (false, false) => {}
            }
        }
        acc.to_affine()
    }
}

// ---------------------------------------------------------------------------
// Jacobian coordinates: (X, Y, Z) represents (X/Z², Y/Z³); Z = 0 is infinity.
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Jacobian {
    x: BigNumber,
    y: BigNumber,
    z: BigNumber,
}

impl From<&Point> for Jacobian {
    fn from(pt: &Point) -> Self {
        match pt {
            Point::Infinity => Jacobian::infinity(),
            Point::Affine { x, y } => Jacobian {
                x: x.clone(),
                y: y.clone(),
                z: BigNumber::one(),
            },
        }
    }
}

impl Jacobian {
    fn infinity() -> Self {
        Jacobian {
            x: BigNumber::one(),
            y: BigNumber::one(),
            z: BigNumber::zero(),
        }
    }

    fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }

    // dbl-2009-l
    fn double(&self) -> Jacobian {
        if self.is_infinity() || self.y.is_zero() {
            return Jacobian::infinity();
        }
        let a = fsqr(&self.x);
        let b = fsqr(&self.y);
        let c = fsqr(&b);
        let d = fsmall(2, &fsub(&fsub(&fsqr(&fadd(&self.x, &b)), &a), &c));
        let e = fsmall(3, &a);
        let f = fsqr(&e);
        let x3 = fsub(&f, &fsmall(2, &d));
        let y3 = fsub(&fmul(&e, &fsub(&d, &x3)), &fsmall(8, &c));
        let z3 = fsmall(2, &fmul(&self.y, &self.z));
        Jacobian {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    // add-2007-bl
    fn add(&self, other: &Jacobian) -> Jacobian {
        if self.is_infinity() {
            return other.clone();
        }
        if other.is_infinity() {
            return self.clone();
        }
        let z1z1 = fsqr(&self.z);
        let z2z2 = fsqr(&other.z);
        let u1 = fmul(&self.x, &z2z2);
        let u2 = fmul(&other.x, &z1z1);
        let s1 = fmul(&fmul(&self.y, &other.z), &z2z2);
        let s2 = fmul(&fmul(&other.y, &self.z), &z1z1);

        if u1 == u2 {
            return if s1 == s2 {
                self.double()
            } else {
                Jacobian::infinity()
            };
        }

        let h = fsub(&u2, &u1);
        let i = fsqr(&fsmall(2, &h));
        let j = fmul(&h, &i);
        let r = fsmall(2, &fsub(&s2, &s1));
        let v = fmul(&u1, &i);
        let x3 = fsub(&fsub(&fsqr(&r), &j), &fsmall(2, &v));
        let y3 = fsub(&fmul(&r, &fsub(&v, &x3)), &fsmall(2, &fmul(&s1, &j)));
        let z3 = fmul(&fsub(&fsub(&fsqr(&fadd(&self.z, &other.z)), &z1z1), &z2z2), &h);
        Jacobian {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    fn to_affine(&self) -> Point {
        if self.is_infinity() {
            return Point::Infinity;
        }
        // Z is a nonzero field element here, so it is always invertible.
        let zinv = match self.z.invm(p()) {
            Ok(v) => v,
            Err(_) => return Point::Infinity,
        };
        let zinv2 = fsqr(&zinv);
        let zinv3 = fmul(&zinv2, &zinv);
        Point::Affine {
            x: fmul(&self.x, &zinv2),
            y: fmul(&self.y, &zinv3),
        }
    }
}
