extern crate proc_macro;

use proc_macro::TokenStream;

mod define_validated;

/// Define one or more validated string newtypes.
///
/// Each definition takes the form `Name(UnderlyingType [casefolded|lowercased]) { body }`,
/// where `body` checks `value: &UnderlyingType` and returns `Ok(())` or
/// `Self::error(value)`. The generated type gets an `Invalid{Name}Error`,
/// an implementation of `Validated`, and the usual conversion traits.
/// Deserialisation goes through validation.
///
/// `casefolded` types compare and hash ignoring ASCII case; `lowercased`
/// types are converted to lower case before they are validated and stored.
#[proc_macro]
pub fn define_validated(input: TokenStream) -> TokenStream
{
    define_validated::define_validated(input)
}
