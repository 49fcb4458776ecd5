use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, Ident, ItemFn, ReturnType, Type};

/// Expands `#[hooklift_runtime::main(profile)]`.
#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(
            &input.sig.fn_token,
            "#[hooklift_runtime::main] can only wrap an async fn",
        )
        .to_compile_error();
    }

    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "#[hooklift_runtime::main] requires the function to return a Result",
        )
        .to_compile_error();
    }

    let profile = match profile(args) {
        Ok(profile) => profile,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn { attrs, vis, sig, block } = input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let config = #profile;
            let runtime = ::hooklift_runtime::build_runtime(&config)?;
            runtime.block_on(async move #block)
        }
    }
}

fn profile(args: TokenStream) -> Result<TokenStream, Error> {
    if args.is_empty() {
        return Ok(quote! { ::hooklift_runtime::RuntimeConfig::cooperative() });
    }

    let ident: Ident = syn::parse2(args)?;
    match ident.to_string().as_str() {
        "cooperative" => Ok(quote! { ::hooklift_runtime::RuntimeConfig::cooperative() }),
        "multi_thread" => Ok(quote! { ::hooklift_runtime::RuntimeConfig::multi_thread() }),
        _ => Err(Error::new_spanned(
            ident,
            "unknown runtime profile, expected `cooperative` or `multi_thread`",
        )),
    }
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = ty.as_ref() else {
        return false;
    };
    path.path.segments.last().is_some_and(|segment| segment.ident == "Result")
}
