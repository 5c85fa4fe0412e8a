use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::{Attribute, Field, FieldsNamed, Token, Type};

// 提取非 derive 属性与已有 derive 列表
pub(crate) fn split_derives(attrs: &[Attribute]) -> (Vec<Attribute>, Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing = Vec::new();
    for attr in attrs.iter() {
        if attr.path().is_ident("derive") {
            if let Ok(list) =
                attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
            {
                existing.extend(list);
            }
        } else {
            retained.push(attr.clone());
        }
    }
    (retained, existing)
}

// 合并默认与已有 derive（去重，优先保留 required）
pub(crate) fn merge_derives(existing: Vec<syn::Path>, required: Vec<syn::Path>) -> Attribute {
    let mut seen = std::collections::HashSet::<String>::new();
    let mut final_list: Vec<syn::Path> = Vec::new();
    for p in required.into_iter().chain(existing) {
        if seen.insert(derive_key(&p)) {
            final_list.push(p);
        }
    }
    syn::parse_quote!(#[derive(#(#final_list),*)])
}

// 归一化 derive 的 key，避免 Serialize/serde::Serialize 重复
pub(crate) fn derive_key(p: &syn::Path) -> String {
    match p.segments.last() {
        Some(last) => {
            let last_ident = last.ident.to_string();
            match last_ident.as_str() {
                "Serialize" | "Deserialize" => format!("serde::{last_ident}"),
                _ => last_ident,
            }
        }
        None => p.to_token_stream().to_string(),
    }
}

// 直接在 attrs 上应用默认派生合并
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let (retained, existing) = split_derives(attrs);
    let merged = merge_derives(existing, required);
    *attrs = std::iter::once(merged).chain(retained).collect();
}

/// 在具名字段最前插入宏管理的字段；用户已声明同名字段时报错
pub(crate) fn prepend_managed_field(
    fields_named: &mut FieldsNamed,
    name: &str,
    ty: &Type,
) -> syn::Result<()> {
    if let Some(existing) = fields_named
        .named
        .iter()
        .find(|f| f.ident.as_ref().is_some_and(|i| i == name))
    {
        return Err(syn::Error::new_spanned(
            existing,
            format!("field `{name}` is reserved and managed by the macro"),
        ));
    }

    let ident = syn::Ident::new(name, proc_macro2::Span::call_site());
    let field: Field = syn::parse_quote! { #ident: #ty };

    let mut named: Punctuated<Field, Token![,]> = Punctuated::new();
    named.push(field);
    named.extend(fields_named.named.clone());
    fields_named.named = named;
    Ok(())
}
