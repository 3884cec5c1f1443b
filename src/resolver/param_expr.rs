// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use chumsky::prelude::*;

use crate::{
    error::{Error, Result},
    naming,
};

#[derive(Clone, Debug, PartialEq)]
pub enum ParamSegment {
    Text(String),
    Param(ParamRef),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamRef {
    pub name: String,
    pub functions: Vec<ParamFunction>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamFunction {
    Uppercase,
    Lowercase,
    LowerUnderscoreCase,
    LowerCamelCase,
}

impl ParamFunction {
    pub fn apply(self, value: &str) -> String {
        match self {
            ParamFunction::Uppercase => value.to_uppercase(),
            ParamFunction::Lowercase => value.to_lowercase(),
            ParamFunction::LowerUnderscoreCase => naming::underscore(value),
            ParamFunction::LowerCamelCase => naming::lower_camel_case(value),
        }
    }
}

pub struct ParamExprParser {
    parser: Box<dyn Parser<char, Vec<ParamSegment>, Error = Simple<char>>>,
}

impl ParamExprParser {
    pub fn new() -> ParamExprParser {
        let parser = gen_param_string_parser();
        ParamExprParser {
            parser: Box::new(parser),
        }
    }

    /// Splits `input` into literal text and `<<name | !function>>` references.
    pub fn parse(&self, input: &str) -> Result<Vec<ParamSegment>> {
        if !input.contains("<<") {
            return Ok(vec![ParamSegment::Text(input.to_string())]);
        }

        self.parser.parse(input).map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|err| err.to_string()).collect();
            Error::Template(format!(
                "invalid parameter reference in {:?}: {}",
                input,
                messages.join("; ")
            ))
        })
    }
}

impl Default for ParamExprParser {
    fn default() -> Self {
        Self::new()
    }
}

fn gen_param_string_parser() -> impl Parser<char, Vec<ParamSegment>, Error = Simple<char>> {
    let name = filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '-')
        .repeated()
        .at_least(1)
        .collect::<String>()
        .labelled("parameter name");

    let function = just('!')
        .ignore_then(
            filter(|c: &char| c.is_ascii_alphabetic())
                .repeated()
                .at_least(1)
                .collect::<String>(),
        )
        .try_map(|function: String, span| match function.as_str() {
            "uppercase" => Ok(ParamFunction::Uppercase),
            "lowercase" => Ok(ParamFunction::Lowercase),
            "lowerunderscorecase" => Ok(ParamFunction::LowerUnderscoreCase),
            "lowercamelcase" => Ok(ParamFunction::LowerCamelCase),
            _ => Err(Simple::custom(span, format!("unknown parameter function '!{}'", function))),
        })
        .labelled("parameter function");

    let param = just("<<")
        .ignore_then(name.padded())
        .then(just('|').ignore_then(function.padded()).repeated())
        .then_ignore(just(">>"))
        .map(|(name, functions)| ParamSegment::Param(ParamRef { name, functions }));

    let text = just("<<")
        .not()
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(ParamSegment::Text);

    param.or(text).repeated().then_ignore(end())
}
