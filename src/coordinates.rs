//! Cell coordinate conversion utilities (A1 notation).
//!
//! Converts between the spreadsheet-style coordinate forms callers use:
//! - A1 notation (e.g., "A1", "B3", "AA10")
//! - Numeric coordinates (column, row as integers)
//! - Area notation (e.g., "A1:B3")
//!
//! Column letters are a 26-ary bijective numeration (A=0, Z=25, AA=26); row
//! numbers are 1-based in string form and 0-based internally. Negative
//! numeric coordinates mean "from the end" and are resolved against the
//! current table extent at operation time, not when the coordinate is built.
//! All off-by-one and from-the-end translation lives here; table code never
//! adjusts indices on its own.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Convert alphabetic column to numeric (0-indexed)
///
/// # Examples
///
/// ```
/// use longan::coordinates::alpha_to_digit;
///
/// assert_eq!(alpha_to_digit("A").unwrap(), 0);
/// assert_eq!(alpha_to_digit("Z").unwrap(), 25);
/// assert_eq!(alpha_to_digit("AA").unwrap(), 26);
/// assert_eq!(alpha_to_digit("ab").unwrap(), 27);
/// ```
pub fn alpha_to_digit(alpha: &str) -> Result<usize> {
    if alpha.is_empty() || !alpha.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::Coordinate(format!(
            "column '{}' is malformed, must contain only letters",
            alpha
        )));
    }

    let mut column = 0usize;
    for c in alpha.chars() {
        let val = (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1) as usize;
        column = column
            .checked_mul(26)
            .and_then(|n| n.checked_add(val))
            .ok_or_else(|| {
                Error::Coordinate(format!("column '{}' is out of range", alpha))
            })?;
    }

    Ok(column - 1)
}

/// Convert numeric column to alphabetic notation (0-indexed)
///
/// Exact inverse of [`alpha_to_digit`] for every non-negative integer.
///
/// # Examples
///
/// ```
/// use longan::coordinates::digit_to_alpha;
///
/// assert_eq!(digit_to_alpha(0), "A");
/// assert_eq!(digit_to_alpha(25), "Z");
/// assert_eq!(digit_to_alpha(26), "AA");
/// ```
pub fn digit_to_alpha(digit: usize) -> String {
    let mut column = String::new();
    let mut n = digit + 1;

    while n > 0 {
        let c = ((n - 1) % 26) as u8;
        column.insert(0, (b'A' + c) as char);
        n = (n - 1) / 26;
    }

    column
}

/// Resolve a possibly-negative index against an extent.
///
/// Negative values count from the end, Python style: `-1` is `len - 1`.
/// Non-negative values pass through unchanged even when they exceed the
/// extent, because reading or writing past the edge of a sparse table is
/// well-defined. Only a negative index that underruns the extent is an
/// error.
pub fn resolve_index(index: isize, len: usize) -> Result<usize> {
    if index >= 0 {
        return Ok(index as usize);
    }
    let adjusted = index + len as isize;
    if adjusted < 0 {
        return Err(Error::Coordinate(format!(
            "index {} out of range for extent {}",
            index, len
        )));
    }
    Ok(adjusted as usize)
}

/// Cell coordinate: column `x` then row `y`, 0-indexed, possibly negative.
///
/// # Examples
///
/// ```
/// use longan::coordinates::Coord;
///
/// let coord: Coord = "B3".parse().unwrap();
/// assert_eq!((coord.x, coord.y), (1, 2));
///
/// // From-the-end coordinates resolve against a concrete extent.
/// let last = Coord::new(-1, -1);
/// assert_eq!(last.resolve(4, 3).unwrap(), (3, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    /// Column index (0-indexed, negative counts from the right edge)
    pub x: isize,
    /// Row index (0-indexed, negative counts from the bottom edge)
    pub y: isize,
}

impl Coord {
    /// Create a new cell coordinate
    #[inline]
    pub const fn new(x: isize, y: isize) -> Self {
        Self { x, y }
    }

    /// Resolve against a table extent, returning concrete `(x, y)`.
    pub fn resolve(self, width: usize, height: usize) -> Result<(usize, usize)> {
        Ok((resolve_index(self.x, width)?, resolve_index(self.y, height)?))
    }

    /// Convert to A1 notation. `None` when either axis is negative, since a
    /// from-the-end coordinate has no extent-independent spelling.
    pub fn to_a1(self) -> Option<String> {
        if self.x < 0 || self.y < 0 {
            return None;
        }
        Some(format!("{}{}", digit_to_alpha(self.x as usize), self.y + 1))
    }
}

impl From<(isize, isize)> for Coord {
    #[inline]
    fn from((x, y): (isize, isize)) -> Self {
        Self::new(x, y)
    }
}

impl From<(i32, i32)> for Coord {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as isize, y as isize)
    }
}

impl From<(usize, usize)> for Coord {
    #[inline]
    fn from((x, y): (usize, usize)) -> Self {
        Self::new(x as isize, y as isize)
    }
}

impl FromStr for Coord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let alpha_len = s.chars().take_while(|c| c.is_ascii_alphabetic()).count();
        if alpha_len == 0 {
            return Err(Error::Coordinate(format!("no column letter in '{}'", s)));
        }

        let numeric = &s[alpha_len..];
        if numeric.is_empty() {
            return Err(Error::Coordinate(format!("no row number in '{}'", s)));
        }

        let column = alpha_to_digit(&s[..alpha_len])?;
        let row: usize = numeric
            .parse()
            .map_err(|_| Error::Coordinate(format!("bad row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::Coordinate(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }

        // Reject indices the signed coordinate space cannot hold; casting
        // would wrap them into from-the-end positions.
        let x = isize::try_from(column)
            .map_err(|_| Error::Coordinate(format!("column out of range in '{}'", s)))?;
        let y = isize::try_from(row - 1)
            .map_err(|_| Error::Coordinate(format!("row out of range in '{}'", s)))?;
        Ok(Self::new(x, y))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_a1() {
            Some(a1) => write!(f, "{}", a1),
            None => write!(f, "({},{})", self.x, self.y),
        }
    }
}

/// Rectangular cell area, inclusive on both ends.
///
/// # Examples
///
/// ```
/// use longan::coordinates::Area;
///
/// let area: Area = "A1:C3".parse().unwrap();
/// assert_eq!((area.start.x, area.start.y), (0, 0));
/// assert_eq!((area.end.x, area.end.y), (2, 2));
///
/// // A bare cell parses as a 1x1 area.
/// let single: Area = "B2".parse().unwrap();
/// assert_eq!(single.start, single.end);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    /// Top-left corner (before resolution; corners may be given in any order)
    pub start: Coord,
    /// Bottom-right corner
    pub end: Coord,
}

impl Area {
    /// Create a new area from two corners
    #[inline]
    pub const fn new(start: Coord, end: Coord) -> Self {
        Self { start, end }
    }

    /// Resolve both corners against a table extent and normalize their
    /// order, returning `((x0, y0), (x1, y1))` with `x0 <= x1, y0 <= y1`.
    pub fn resolve(self, width: usize, height: usize) -> Result<((usize, usize), (usize, usize))> {
        let (ax, ay) = self.start.resolve(width, height)?;
        let (bx, by) = self.end.resolve(width, height)?;
        Ok((
            (ax.min(bx), ay.min(by)),
            (ax.max(bx), ay.max(by)),
        ))
    }
}

impl From<(Coord, Coord)> for Area {
    #[inline]
    fn from((start, end): (Coord, Coord)) -> Self {
        Self::new(start, end)
    }
}

impl From<(isize, isize, isize, isize)> for Area {
    #[inline]
    fn from((x0, y0, x1, y1): (isize, isize, isize, isize)) -> Self {
        Self::new(Coord::new(x0, y0), Coord::new(x1, y1))
    }
}

impl From<(i32, i32, i32, i32)> for Area {
    #[inline]
    fn from((x0, y0, x1, y1): (i32, i32, i32, i32)) -> Self {
        Self::new(
            Coord::new(x0 as isize, y0 as isize),
            Coord::new(x1 as isize, y1 as isize),
        )
    }
}

impl From<(usize, usize, usize, usize)> for Area {
    #[inline]
    fn from((x0, y0, x1, y1): (usize, usize, usize, usize)) -> Self {
        Self::new(
            Coord::new(x0 as isize, y0 as isize),
            Coord::new(x1 as isize, y1 as isize),
        )
    }
}

impl From<Coord> for Area {
    #[inline]
    fn from(coord: Coord) -> Self {
        Self::new(coord, coord)
    }
}

impl FromStr for Area {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((start, end)) => Ok(Self::new(start.trim().parse()?, end.trim().parse()?)),
            None => {
                let coord: Coord = s.parse()?;
                Ok(Self::new(coord, coord))
            },
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Conversion into a [`Coord`], fallible for string forms.
///
/// Lets cell-level table operations accept `"B3"`, `(1, 2)`, or an explicit
/// [`Coord`] interchangeably.
pub trait IntoCoord {
    /// Convert into a coordinate
    fn into_coord(self) -> Result<Coord>;
}

impl IntoCoord for Coord {
    #[inline]
    fn into_coord(self) -> Result<Coord> {
        Ok(self)
    }
}

impl IntoCoord for (isize, isize) {
    #[inline]
    fn into_coord(self) -> Result<Coord> {
        Ok(self.into())
    }
}

impl IntoCoord for (i32, i32) {
    #[inline]
    fn into_coord(self) -> Result<Coord> {
        Ok(self.into())
    }
}

impl IntoCoord for (usize, usize) {
    #[inline]
    fn into_coord(self) -> Result<Coord> {
        Ok(self.into())
    }
}

impl IntoCoord for &str {
    #[inline]
    fn into_coord(self) -> Result<Coord> {
        self.parse()
    }
}

/// Conversion into an [`Area`], fallible for string forms.
pub trait IntoArea {
    /// Convert into an area
    fn into_area(self) -> Result<Area>;
}

impl IntoArea for Area {
    #[inline]
    fn into_area(self) -> Result<Area> {
        Ok(self)
    }
}

impl IntoArea for Coord {
    #[inline]
    fn into_area(self) -> Result<Area> {
        Ok(self.into())
    }
}

impl IntoArea for (isize, isize, isize, isize) {
    #[inline]
    fn into_area(self) -> Result<Area> {
        Ok(self.into())
    }
}

impl IntoArea for (i32, i32, i32, i32) {
    #[inline]
    fn into_area(self) -> Result<Area> {
        Ok(self.into())
    }
}

impl IntoArea for (usize, usize, usize, usize) {
    #[inline]
    fn into_area(self) -> Result<Area> {
        Ok(self.into())
    }
}

impl IntoArea for &str {
    #[inline]
    fn into_area(self) -> Result<Area> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_to_digit() {
        assert_eq!(alpha_to_digit("A").unwrap(), 0);
        assert_eq!(alpha_to_digit("B").unwrap(), 1);
        assert_eq!(alpha_to_digit("Z").unwrap(), 25);
        assert_eq!(alpha_to_digit("AA").unwrap(), 26);
        assert_eq!(alpha_to_digit("AB").unwrap(), 27);
        assert_eq!(alpha_to_digit("AZ").unwrap(), 51);
        assert_eq!(alpha_to_digit("BA").unwrap(), 52);

        // Case insensitive
        assert_eq!(alpha_to_digit("a").unwrap(), 0);
        assert_eq!(alpha_to_digit("aa").unwrap(), 26);

        // Errors
        assert!(alpha_to_digit("").is_err());
        assert!(alpha_to_digit("A1").is_err());
        assert!(alpha_to_digit("1A").is_err());
    }

    #[test]
    fn test_alpha_to_digit_rejects_oversized_names() {
        assert!(alpha_to_digit("ZZZZZZZZZZZZZZ").is_err());
        assert!(alpha_to_digit(&"A".repeat(64)).is_err());

        // Fits in the unsigned codec but not in a signed coordinate.
        let huge = "EAAAAAAAAAAAAA";
        assert!(alpha_to_digit(huge).unwrap() > isize::MAX as usize);
        assert!(format!("{}1", huge).parse::<Coord>().is_err());
        assert!("ZZZZZZZZZZZZZZ1".parse::<Coord>().is_err());
    }

    #[test]
    fn test_digit_to_alpha() {
        assert_eq!(digit_to_alpha(0), "A");
        assert_eq!(digit_to_alpha(1), "B");
        assert_eq!(digit_to_alpha(25), "Z");
        assert_eq!(digit_to_alpha(26), "AA");
        assert_eq!(digit_to_alpha(27), "AB");
        assert_eq!(digit_to_alpha(51), "AZ");
        assert_eq!(digit_to_alpha(52), "BA");
        assert_eq!(digit_to_alpha(701), "ZZ");
        assert_eq!(digit_to_alpha(702), "AAA");
    }

    #[test]
    fn test_column_bijection() {
        for i in 0..10_000 {
            let alpha = digit_to_alpha(i);
            assert_eq!(alpha_to_digit(&alpha).unwrap(), i);
        }
    }

    #[test]
    fn test_column_order_is_strictly_increasing() {
        // Spreadsheet column order: shorter names sort before longer ones,
        // same-length names sort lexicographically.
        let mut prev = digit_to_alpha(0);
        for i in 1..10_000 {
            let next = digit_to_alpha(i);
            assert!(
                (prev.len(), prev.as_str()) < (next.len(), next.as_str()),
                "{} should precede {}",
                prev,
                next
            );
            prev = next;
        }
    }

    #[test]
    fn test_coord_parse() {
        let coord: Coord = "A1".parse().unwrap();
        assert_eq!((coord.x, coord.y), (0, 0));

        let coord: Coord = "B3".parse().unwrap();
        assert_eq!((coord.x, coord.y), (1, 2));

        let coord: Coord = "aa10".parse().unwrap();
        assert_eq!((coord.x, coord.y), (26, 9));

        // Errors
        assert!("A0".parse::<Coord>().is_err()); // Row must be >= 1
        assert!("1A".parse::<Coord>().is_err()); // No column
        assert!("A".parse::<Coord>().is_err()); // No row
        assert!("A1.5".parse::<Coord>().is_err());
    }

    #[test]
    fn test_coord_display() {
        assert_eq!(Coord::new(0, 0).to_string(), "A1");
        assert_eq!(Coord::new(1, 2).to_string(), "B3");
        assert_eq!(Coord::new(26, 9).to_string(), "AA10");
    }

    #[test]
    fn test_coord_resolve_negative() {
        assert_eq!(Coord::new(-1, -1).resolve(4, 3).unwrap(), (3, 2));
        assert_eq!(Coord::new(-4, 0).resolve(4, 3).unwrap(), (0, 0));
        assert!(Coord::new(-5, 0).resolve(4, 3).is_err());

        // Positive overruns pass through for sparse access.
        assert_eq!(Coord::new(10, 10).resolve(4, 3).unwrap(), (10, 10));
    }

    #[test]
    fn test_area_parse() {
        let area: Area = "A1:B3".parse().unwrap();
        assert_eq!((area.start.x, area.start.y), (0, 0));
        assert_eq!((area.end.x, area.end.y), (1, 2));

        let single: Area = "B2".parse().unwrap();
        assert_eq!(single.start, single.end);
        assert_eq!((single.start.x, single.start.y), (1, 1));

        assert!("A1:".parse::<Area>().is_err());
        assert!(":B3".parse::<Area>().is_err());
    }

    #[test]
    fn test_area_resolve_normalizes_corners() {
        let area: Area = (2isize, 2, 0, 0).into_area().unwrap();
        assert_eq!(area.resolve(5, 5).unwrap(), ((0, 0), (2, 2)));

        let area: Area = (0isize, 0, -1, -1).into_area().unwrap();
        assert_eq!(area.resolve(4, 3).unwrap(), ((0, 0), (3, 2)));
    }

    #[test]
    fn test_into_coord_forms() {
        assert_eq!("B3".into_coord().unwrap(), Coord::new(1, 2));
        assert_eq!((1isize, 2).into_coord().unwrap(), Coord::new(1, 2));
        assert_eq!((1usize, 2usize).into_coord().unwrap(), Coord::new(1, 2));
        assert!("nope!".into_coord().is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(512))]

            /// Column naming is a bijection over the whole index space.
            #[test]
            fn prop_column_name_round_trip(n in 0usize..1_000_000) {
                let name = digit_to_alpha(n);
                prop_assert!(name.bytes().all(|b| b.is_ascii_uppercase()));
                prop_assert_eq!(alpha_to_digit(&name).unwrap(), n);
            }

            /// Coordinates survive the A1-notation round trip.
            #[test]
            fn prop_coord_round_trip(x in 0usize..100_000, y in 0usize..100_000) {
                let coord = Coord::new(x as isize, y as isize);
                prop_assert_eq!(coord.to_string().parse::<Coord>().unwrap(), coord);
            }
        }
    }
}
