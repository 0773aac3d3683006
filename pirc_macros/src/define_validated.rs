use super::*;

use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parenthesized,
    parse::{Parse, ParseStream},
    parse_macro_input,
    Block,
    Ident,
    Result,
    Type,
};

/// How a validated type treats letter case
#[derive(Clone, Copy)]
enum Case
{
    Preserved,
    /// Stored as given; compared and hashed ignoring ASCII case
    Folded,
    /// Converted to lower case before validation
    Lowered,
}

impl Parse for Case
{
    fn parse(input: ParseStream) -> Result<Self>
    {
        if input.is_empty()
        {
            return Ok(Self::Preserved);
        }

        let word: Ident = input.parse()?;
        match word.to_string().as_str()
        {
            "casefolded" => Ok(Self::Folded),
            "lowercased" => Ok(Self::Lowered),
            _ => Err(syn::Error::new(word.span(), "expected `casefolded` or `lowercased`")),
        }
    }
}

/// `Name(Underlying [case]) { validation body }`
struct Definition
{
    name: Ident,
    underlying: Type,
    case: Case,
    body: Block,
}

impl Parse for Definition
{
    fn parse(input: ParseStream) -> Result<Self>
    {
        let name = input.parse()?;
        let inner;
        parenthesized!(inner in input);
        let underlying = inner.parse()?;
        let case = inner.parse()?;
        let body = input.parse()?;

        Ok(Self { name, underlying, case, body })
    }
}

struct Definitions(Vec<Definition>);

impl Parse for Definitions
{
    fn parse(input: ParseStream) -> Result<Self>
    {
        let mut defs = Vec::new();
        while !input.is_empty()
        {
            defs.push(input.parse()?);
        }
        Ok(Self(defs))
    }
}

pub fn define_validated(input: TokenStream) -> TokenStream
{
    let Definitions(defs) = parse_macro_input!(input as Definitions);

    defs.iter()
        .map(Definition::expand)
        .collect::<TokenStream2>()
        .into()
}

impl Definition
{
    fn expand(&self) -> TokenStream2
    {
        let core = self.core();
        let conversions = self.conversions();
        let comparisons = match self.case {
            Case::Folded => self.folded_comparisons(),
            _ => quote!(),
        };

        quote!( #core #conversions #comparisons )
    }

    fn error_type(&self) -> Ident
    {
        Ident::new(&format!("Invalid{}Error", self.name), Span::call_site())
    }

    /// The error type, the newtype itself, and its `Validated` implementation
    fn core(&self) -> TokenStream2
    {
        let name = &self.name;
        let underlying = &self.underlying;
        let body = &self.body;
        let error = self.error_type();
        let message = format!("Invalid value for {}: {{0}}", name);

        let comparison_derives = match self.case {
            Case::Folded => quote!(),
            _ => quote!( #[derive(PartialEq, Eq, Hash, PartialOrd, Ord)] ),
        };

        let normalise = match self.case {
            Case::Lowered => quote!( std::borrow::Cow::Owned(arg.to_lowercase()) ),
            _ => quote!( std::borrow::Cow::Borrowed(arg) ),
        };

        quote!(
            #[derive(Debug, Clone, Error)]
            #[error(#message)]
            pub struct #error(pub String);

            impl From<StringValidationError> for #error
            {
                fn from(e: StringValidationError) -> Self
                {
                    Self(e.0)
                }
            }

            #comparison_derives
            #[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
            #[serde(try_from = "String", into = "String")]
            pub struct #name(#underlying);

            impl #name
            {
                fn error(value: impl std::string::ToString) -> std::result::Result<(), #error>
                {
                    Err(#error(value.to_string()))
                }

                fn normalise(arg: &str) -> std::borrow::Cow<'_, str>
                {
                    #normalise
                }

                fn checked(value: #underlying) -> std::result::Result<Self, #error>
                {
                    <Self as Validated>::validate(&value)?;
                    Ok(Self(value))
                }
            }

            impl crate::validated::Validated for #name
            {
                type Underlying = #underlying;
                type Error = #error;
                type Result = std::result::Result<#name, #error>;

                fn validate(value: &#underlying) -> std::result::Result<(), #error>
                #body

                fn new(arg: #underlying) -> Self::Result
                {
                    std::str::FromStr::from_str(arg.as_ref())
                }

                fn value(&self) -> &#underlying
                {
                    &self.0
                }

                fn convert(arg: impl std::string::ToString) -> Self::Result
                {
                    std::str::FromStr::from_str(&arg.to_string())
                }
            }
        )
    }

    /// Parsing, conversions to and from strings, and formatting
    fn conversions(&self) -> TokenStream2
    {
        let name = &self.name;
        let underlying = &self.underlying;
        let error = self.error_type();

        quote!(
            impl std::str::FromStr for #name
            {
                type Err = #error;

                fn from_str(arg: &str) -> std::result::Result<Self, #error>
                {
                    let arg = Self::normalise(arg);
                    match <#underlying as std::convert::TryFrom<&str>>::try_from(arg.as_ref())
                    {
                        Ok(value) => Self::checked(value),
                        Err(_) => Err(#error(arg.into_owned())),
                    }
                }
            }

            impl std::convert::TryFrom<#underlying> for #name
            {
                type Error = #error;

                fn try_from(arg: #underlying) -> std::result::Result<Self, #error>
                {
                    <Self as Validated>::new(arg)
                }
            }

            impl std::convert::TryFrom<String> for #name
            {
                type Error = #error;

                fn try_from(arg: String) -> std::result::Result<Self, #error>
                {
                    arg.parse()
                }
            }

            impl std::convert::TryFrom<&str> for #name
            {
                type Error = #error;

                fn try_from(arg: &str) -> std::result::Result<Self, #error>
                {
                    arg.parse()
                }
            }

            // The underlying type is foreign, so From can't be implemented on it
            #[allow(clippy::from_over_into)]
            impl Into<#underlying> for #name
            {
                fn into(self) -> #underlying
                {
                    self.0
                }
            }

            impl From<#name> for String
            {
                fn from(val: #name) -> String
                {
                    val.0.to_string()
                }
            }

            impl std::fmt::Display for #name
            {
                fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
                {
                    std::fmt::Display::fmt(&self.0, f)
                }
            }

            impl AsRef<str> for #name
            {
                fn as_ref(&self) -> &str
                {
                    self.0.as_ref()
                }
            }
        )
    }

    /// Equality, ordering and hashing on the ASCII-lowercased characters
    fn folded_comparisons(&self) -> TokenStream2
    {
        let name = &self.name;

        quote!(
            impl #name
            {
                fn folded(&self) -> impl Iterator<Item = char> + '_
                {
                    self.0.chars().map(|c| c.to_ascii_lowercase())
                }
            }

            impl PartialEq for #name
            {
                fn eq(&self, other: &Self) -> bool
                {
                    self.folded().eq(other.folded())
                }
            }

            impl Eq for #name {}

            impl Ord for #name
            {
                fn cmp(&self, other: &Self) -> std::cmp::Ordering
                {
                    self.folded().cmp(other.folded())
                }
            }

            impl PartialOrd for #name
            {
                fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering>
                {
                    Some(self.cmp(other))
                }
            }

            impl std::hash::Hash for #name
            {
                fn hash<H: std::hash::Hasher>(&self, state: &mut H)
                {
                    for c in self.folded()
                    {
                        std::hash::Hash::hash(&c, state);
                    }
                }
            }
        )
    }
}
