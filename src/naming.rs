// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Maps the document's property naming convention (mixedCase, dashed) onto
// the identifier form used in type schemas.


/// `maxLength` -> `max_length`, `HTTPHeader` -> `http_header`, `base-uri` -> `base_uri`.
pub fn underscore(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' {
            out.push('_');
            continue;
        }

        if c.is_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();

            // Start of a new word: after a lowercase letter or digit, or the last
            // capital of an acronym followed by a lowercase letter.
            let word_start = match prev {
                Some(prev) if prev.is_lowercase() || prev.is_ascii_digit() => true,
                Some(prev) if prev.is_uppercase() => next.is_some_and(|next| next.is_lowercase()),
                _ => false,
            };
            if word_start && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            continue;
        }

        out.push(c);
    }

    out
}

/// `max_length` -> `maxLength`.
pub fn lower_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in underscore(name).chars() {
        if c == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
