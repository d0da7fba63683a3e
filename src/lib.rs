/*!
A memory-safe, pure-Rust decoder for JBIG2 symbol dictionary segments.

`jbig2-symdict` decodes the symbol dictionary segments of JBIG2 as specified
in ITU-T T.88 (also known as ISO/IEC 14492), sections 6.5 and 7.4.2. A symbol
dictionary holds the small bitmaps, usually glyphs of scanned text, that text
region segments later place on the page. Both coding variants are supported:
arithmetic coding, including refinement and aggregation of already-decoded
symbols, and Huffman coding with per-height-class collective bitmaps.

The decoder works on one segment's data part. Feeding it the symbols and
user-supplied Huffman tables of the segments it refers to is the caller's
job, since segment referral lives a level above the segment payloads.

# Example
```rust,no_run
use jbig2_symdict::decode_symbol_dictionary;

let data = std::fs::read("dictionary.seg").unwrap();
let dictionary = decode_symbol_dictionary(&data, &[], &[]).unwrap();

for symbol in dictionary.symbols.iter().flatten() {
    println!("{}x{} symbol", symbol.width(), symbol.height());
}
```

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![allow(missing_docs)]

mod arithmetic;
mod bitmap;
mod error;
mod generic;
mod huffman;
mod integer;
mod reader;
mod refinement;
mod symbol_dictionary;
mod text;

pub use bitmap::Bitmap;
pub use error::{
    DecodeError, HuffmanError, ParseError, RegionError, Result, SymbolError, TemplateError,
};
pub use huffman::HuffmanTable;
pub use symbol_dictionary::{SymbolDictionary, decode_symbol_dictionary};
