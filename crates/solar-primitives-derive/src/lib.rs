//! Procedural macros for consensus encoding of fixed-layout structs.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `Encodable` and `Decodable` for a struct whose wire layout is the
/// concatenation of its fields in declaration order.
///
/// The generated code refers to `crate::consensus` and `crate::io`, so the
/// macro is meant for use inside `solar-primitives` only.
///
/// # Example
///
/// ```ignore
/// use solar_primitives_derive::ConsensusCodec;
///
/// #[derive(ConsensusCodec)]
/// struct Header {
///     version: HeaderVersion,
///     prev_blockhash: BlockHash,
///     merkle_root: TxMerkleNode,
///     time: u32,
///     bits: u32,
///     nonce: u32,
/// }
/// ```
#[proc_macro_derive(ConsensusCodec)]
pub fn derive_consensus_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unnamed(fields) => &fields.unnamed,
            Fields::Unit => {
                return syn::Error::new_spanned(&input, "ConsensusCodec needs at least one field")
                    .to_compile_error()
                    .into();
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return syn::Error::new_spanned(&input, "ConsensusCodec only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let named = fields.iter().any(|f| f.ident.is_some());

    let accessors: Vec<_> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| match &field.ident {
            Some(ident) => quote! { self.#ident },
            None => {
                let index = syn::Index::from(i);
                quote! { self.#index }
            }
        })
        .collect();

    // Each field decodes from the same reader, in declaration order.
    let decoders = |reader: TokenStream2| -> Vec<TokenStream2> {
        fields
            .iter()
            .map(|field| {
                let decode = quote! {
                    crate::consensus::Decodable::consensus_decode_from_finite_reader(#reader)?
                };
                match &field.ident {
                    Some(ident) => quote! { #ident: #decode },
                    None => decode,
                }
            })
            .collect()
    };

    let finite = decoders(quote! { reader });
    let limited = decoders(quote! { &mut limited });

    let build = |parts: &[TokenStream2]| {
        if named {
            quote! { #name { #(#parts),* } }
        } else {
            quote! { #name(#(#parts),*) }
        }
    };
    let construct_finite = build(&finite);
    let construct_limited = build(&limited);

    let expanded = quote! {
        impl #impl_generics crate::consensus::Encodable for #name #ty_generics #where_clause {
            #[inline]
            fn consensus_encode<W: crate::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> core::result::Result<usize, crate::io::Error> {
                let mut len: usize = 0;
                #(
                    len = len.saturating_add(
                        crate::consensus::Encodable::consensus_encode(&#accessors, writer)?,
                    );
                )*
                Ok(len)
            }
        }

        impl #impl_generics crate::consensus::Decodable for #name #ty_generics #where_clause {
            #[inline]
            fn consensus_decode_from_finite_reader<R: crate::io::Read + ?Sized>(
                reader: &mut R,
            ) -> core::result::Result<Self, crate::consensus::EncodeDecodeError> {
                Ok(#construct_finite)
            }

            #[inline]
            fn consensus_decode<R: crate::io::Read + ?Sized>(
                reader: &mut R,
            ) -> core::result::Result<Self, crate::consensus::EncodeDecodeError> {
                use crate::io::Read;
                let mut limited = reader.take(crate::consensus::MAX_VEC_SIZE as u64);
                Ok(#construct_limited)
            }
        }
    };

    TokenStream::from(expanded)
}
