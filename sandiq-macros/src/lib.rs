//! Procedural macros for Sandiq.
//!
//! Provides `#[registration]`, which turns a method returning a factory
//! closure into a registration declaration keyed by the method's name.

use darling::FromMeta;
use darling::ast::NestedMeta;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{FnArg, ImplItemFn, parse_macro_input};

/// Arguments accepted by `#[registration(...)]`.
#[derive(Debug, Default, FromMeta)]
struct RegistrationArgs {
    /// Build a fresh value on every resolve.
    #[darling(default)]
    unique: bool,
    /// Use this name instead of the declaration path.
    #[darling(default)]
    key: Option<String>,
}

/// Declares a registration.
///
/// The annotated method must take `&self` on a `Container` and its body
/// must evaluate to the default factory. The key is the one `key!()` builds
/// for the method, so it includes the implemented trait and two traits may
/// declare methods of the same name. `key = "..."` uses a literal instead.
///
/// The expansion refers to `::sandiq::Registration`, `::sandiq::Key` and
/// `::sandiq::key!`, so the calling crate must depend on the `sandiq` facade.
/// Crates that use only `sandiq-container` write `Registration::new` with
/// `key!()` by hand.
///
/// ```rust,ignore
/// trait Services {
///     fn database(&self) -> Registration<'_, Arc<Database>>;
///     fn request_id(&self) -> Registration<'_, u64>;
/// }
///
/// impl Services for Container {
///     #[registration]
///     fn database(&self) -> Registration<'_, Arc<Database>> {
///         |_| Arc::new(Database::connect("postgres://localhost"))
///     }
///
///     #[registration(unique)]
///     fn request_id(&self) -> Registration<'_, u64> {
///         |_| next_request_id()
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn registration(args: TokenStream, input: TokenStream) -> TokenStream {
    let metas = match NestedMeta::parse_meta_list(args.into()) {
        Ok(metas) => metas,
        Err(error) => return TokenStream::from(darling::Error::from(error).write_errors()),
    };
    let args = match RegistrationArgs::from_list(&metas) {
        Ok(args) => args,
        Err(error) => return TokenStream::from(error.write_errors()),
    };
    let method = parse_macro_input!(input as ImplItemFn);

    match expand(args, method) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(args: RegistrationArgs, method: ImplItemFn) -> syn::Result<TokenStream2> {
    let has_self_ref = matches!(
        method.sig.inputs.first(),
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none()
    );
    if !has_self_ref {
        return Err(syn::Error::new(
            method.sig.span(),
            "#[registration] methods must take `&self`",
        ));
    }
    if method.sig.inputs.len() > 1 {
        return Err(syn::Error::new(
            method.sig.inputs.span(),
            "#[registration] methods take no arguments besides `&self`",
        ));
    }

    let key = match &args.key {
        Some(key) => quote!(::sandiq::Key::new(#key)),
        None => quote!(::sandiq::key!()),
    };
    let lifetime = if args.unique {
        quote!(.unique())
    } else {
        TokenStream2::new()
    };

    let ImplItemFn {
        attrs,
        vis,
        defaultness,
        sig,
        block,
    } = method;
    let factory = quote_spanned!(block.span()=> #block);

    Ok(quote! {
        #(#attrs)*
        #vis #defaultness #sig {
            ::sandiq::Registration::new(self, #key, #factory)#lifetime
        }
    })
}
