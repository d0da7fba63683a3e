//! Error types for symbol dictionary decoding.

use core::fmt;

/// The main error type for JBIG2 symbol dictionary decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Errors related to reading the raw bitstream.
    Parse(ParseError),
    /// Errors related to Huffman tables and codes.
    Huffman(HuffmanError),
    /// Errors related to region dimensions.
    Region(RegionError),
    /// Errors related to template configuration.
    Template(TemplateError),
    /// Errors related to symbol handling.
    Symbol(SymbolError),
    /// Arithmetic overflow in a coordinate or size calculation.
    Overflow,
}

/// Errors related to reading the raw bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Unexpected end of input.
    UnexpectedEof,
}

/// Errors related to Huffman tables and codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanError {
    /// A bit sequence that matches no code in the table.
    InvalidCode,
    /// A reserved table selection value in the segment flags.
    InvalidSelection,
    /// The segment selects more user-supplied tables than were referred.
    MissingTables,
    /// An out-of-band result where only a plain value is valid.
    UnexpectedOob,
}

/// Errors related to region dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
    /// A negative or over-maximum width or height.
    InvalidDimension,
    /// MMR data that does not decode to the declared region.
    InvalidMmrData,
}

/// Errors related to template configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateError {
    /// An adaptive template pixel referencing not-yet-decoded pixels.
    InvalidAtPixel,
}

/// Errors related to symbol handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolError {
    /// The stream contains more new symbols than the header declared.
    TooManySymbols,
    /// A symbol ID past the end of the symbol list.
    OutOfRange,
    /// An out-of-band result in an integer field where only plain values
    /// are valid.
    UnexpectedOob,
    /// Consecutive height classes containing no symbols.
    EmptyHeightClasses,
    /// A refinement reference to a zero-size placeholder symbol.
    NullReference,
    /// A non-positive aggregate instance count.
    InvalidAggregateCount,
    /// An export run passing the end of the combined symbol list.
    ExportRunOverflow,
    /// More exported symbols than the header declared.
    TooManyExports,
    /// An embedded refinement region whose consumed size does not match
    /// the declared size.
    SizeMismatch,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Huffman(e) => write!(f, "{e}"),
            Self::Region(e) => write!(f, "{e}"),
            Self::Template(e) => write!(f, "{e}"),
            Self::Symbol(e) => write!(f, "{e}"),
            Self::Overflow => write!(f, "arithmetic overflow"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

impl fmt::Display for HuffmanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCode => write!(f, "invalid Huffman code"),
            Self::InvalidSelection => write!(f, "invalid Huffman table selection"),
            Self::MissingTables => write!(f, "not enough referred Huffman tables"),
            Self::UnexpectedOob => write!(f, "unexpected out-of-band value"),
        }
    }
}

impl fmt::Display for RegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension => write!(f, "invalid region dimension"),
            Self::InvalidMmrData => write!(f, "invalid MMR data"),
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAtPixel => write!(f, "invalid adaptive template pixel location"),
        }
    }
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManySymbols => write!(f, "more new symbols than declared"),
            Self::OutOfRange => write!(f, "symbol ID out of range"),
            Self::UnexpectedOob => write!(f, "unexpected out-of-band integer"),
            Self::EmptyHeightClasses => write!(f, "consecutive empty height classes"),
            Self::NullReference => write!(f, "refinement references a null symbol"),
            Self::InvalidAggregateCount => write!(f, "invalid aggregate instance count"),
            Self::ExportRunOverflow => write!(f, "export run passes end of symbol list"),
            Self::TooManyExports => write!(f, "more exported symbols than declared"),
            Self::SizeMismatch => write!(f, "embedded region size mismatch"),
        }
    }
}

impl core::error::Error for DecodeError {}
impl core::error::Error for ParseError {}
impl core::error::Error for HuffmanError {}
impl core::error::Error for RegionError {}
impl core::error::Error for TemplateError {}
impl core::error::Error for SymbolError {}

impl From<ParseError> for DecodeError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<HuffmanError> for DecodeError {
    fn from(e: HuffmanError) -> Self {
        Self::Huffman(e)
    }
}

impl From<RegionError> for DecodeError {
    fn from(e: RegionError) -> Self {
        Self::Region(e)
    }
}

impl From<TemplateError> for DecodeError {
    fn from(e: TemplateError) -> Self {
        Self::Template(e)
    }
}

impl From<SymbolError> for DecodeError {
    fn from(e: SymbolError) -> Self {
        Self::Symbol(e)
    }
}

/// Result type for symbol dictionary decoding.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

pub(crate) use bail;
