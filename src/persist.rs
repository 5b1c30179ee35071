//! Whitespace delimited text format of vectors and matrices.
//!
//! vector: `[ size : v0 v1 ...]`
//!
//! matrix: `[ rowsxcols : m00 m01 ...]` in row major order. Whitespace around the `x` is accepted when reading.
//!
//! Scalars are written with their `Display` representation, which for `f32`/`f64` is the shortest representation
//! that reads back to the identical value.

use std::fmt::{self, Display};
use std::io::BufRead;
use std::str::FromStr;

use na::{DMatrix, DVector, RealField};
use nalgebra as na;

use crate::error::{KtdError, Result};

pub fn write_vector<N: RealField + Display>(f: &mut impl fmt::Write, v: &DVector<N>) -> fmt::Result {
    write!(f, "[ {} :", v.nrows())?;
    for x in v.iter() {
        write!(f, " {}", x)?;
    }
    write!(f, "]")
}

pub fn write_matrix<N: RealField + Display>(f: &mut impl fmt::Write, m: &DMatrix<N>) -> fmt::Result {
    write!(f, "[ {}x{} :", m.nrows(), m.ncols())?;
    for i in 0..m.nrows() {
        for j in 0..m.ncols() {
            write!(f, " {}", m[(i, j)])?;
        }
    }
    write!(f, "]")
}

/// Reads the text format from a buffered stream.
///
/// Only the bytes of the values read are consumed, data following them remains in the stream.
pub struct Scanner<'r, R: BufRead> {
    input: &'r mut R,
}

impl<'r, R: BufRead> Scanner<'r, R> {
    pub fn new(input: &'r mut R) -> Self {
        Scanner { input }
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        let buf = self.input.fill_buf()?;
        Ok(buf.first().copied())
    }

    fn bump(&mut self) {
        self.input.consume(1);
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(c) = self.peek()? {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.bump();
        }
        Ok(())
    }

    /// Consume the delimiter `expected`, preceded by optional whitespace.
    pub fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace()?;
        match self.peek()? {
            Some(c) if c as char == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(KtdError::parse(format!("expected '{}', found '{}'", expected, c as char))),
            None => Err(KtdError::parse(format!("expected '{}', found end of stream", expected))),
        }
    }

    /// Collect the bytes of a token, preceded by optional whitespace, while `accept` holds.
    fn token(&mut self, accept: impl Fn(u8) -> bool) -> Result<String> {
        self.skip_whitespace()?;
        let mut token = String::new();
        while let Some(c) = self.peek()? {
            if !accept(c) {
                break;
            }
            token.push(c as char);
            self.bump();
        }
        if token.is_empty() {
            return match self.peek()? {
                Some(c) => Err(KtdError::parse(format!("expected a value, found '{}'", c as char))),
                None => Err(KtdError::parse("expected a value, found end of stream")),
            };
        }
        Ok(token)
    }

    pub fn read_size(&mut self) -> Result<usize> {
        let token = self.token(|c| c.is_ascii_digit())?;
        token
            .parse()
            .map_err(|_| KtdError::parse(format!("bad size '{}'", token)))
    }

    pub fn read_scalar<N: FromStr>(&mut self) -> Result<N> {
        let token = self.token(|c| !c.is_ascii_whitespace() && c != b']' && c != b'[')?;
        token
            .parse()
            .map_err(|_| KtdError::parse(format!("bad number '{}'", token)))
    }

    pub fn read_vector<N: RealField + FromStr>(&mut self) -> Result<DVector<N>> {
        self.expect('[')?;
        let size = self.read_size()?;
        self.expect(':')?;
        let mut values = Vec::new();
        for _ in 0..size {
            values.push(self.read_scalar()?);
        }
        self.expect(']')?;
        Ok(DVector::from_vec(values))
    }

    pub fn read_matrix<N: RealField + FromStr>(&mut self) -> Result<DMatrix<N>> {
        self.expect('[')?;
        let rows = self.read_size()?;
        self.expect('x')?;
        let cols = self.read_size()?;
        self.expect(':')?;
        let mut values = Vec::new();
        for _ in 0..rows.saturating_mul(cols) {
            values.push(self.read_scalar()?);
        }
        self.expect(']')?;
        Ok(DMatrix::from_row_slice(rows, cols, &values))
    }
}
