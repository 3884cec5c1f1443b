use std::sync::Arc;

use anyhow::{anyhow, Error};
use hashlink::LinkedHashMap;
use saphyr::YamlLoader;

use super::Yaml;

pub fn parse_yaml_str(input: &str) -> Result<Vec<Yaml>, Error> {
    let raw_docs = YamlLoader::load_from_str(input)?;

    // Convert docs.
    let mut docs = Vec::new();
    for raw_doc in &raw_docs {
        let doc = convert_node(raw_doc)?;
        docs.push(doc);
    }

    Ok(docs)
}

fn convert_node(raw: &saphyr::Yaml) -> Result<Yaml, Error> {
    match raw {
        saphyr::Yaml::Array(values) => convert_sequence(values),
        saphyr::Yaml::Hash(map) => convert_mapping(map.iter()),
        saphyr::Yaml::Real(value) => Ok(Yaml::Real(Arc::new(value.clone()))),
        saphyr::Yaml::Integer(value) => Ok(Yaml::Integer(*value)),
        saphyr::Yaml::String(value) => Ok(Yaml::String(Arc::new(value.clone()))),
        saphyr::Yaml::Boolean(value) => Ok(Yaml::Boolean(*value)),
        saphyr::Yaml::Null => Ok(Yaml::Null),
        saphyr::Yaml::Alias(_) => Err(anyhow!("yaml aliases not supported")),
        saphyr::Yaml::BadValue => Err(anyhow!("invalid yaml value")),
    }
}

fn convert_sequence(raw_values: &[saphyr::Yaml]) -> Result<Yaml, Error> {
    let mut values = Vec::new();
    for raw_value in raw_values {
        let value = convert_node(raw_value)?;
        values.push(value);
    }

    let seq = Yaml::Array(Arc::new(values));
    Ok(seq)
}

fn convert_mapping<'a>(raw_entries: impl Iterator<Item = (&'a saphyr::Yaml, &'a saphyr::Yaml)>) -> Result<Yaml, Error> {
    let mut map = LinkedHashMap::new();
    for (raw_key, raw_value) in raw_entries {
        let key = convert_node(raw_key)?;
        let value = convert_node(raw_value)?;
        map.insert(key, value);
    }

    let map = Yaml::Hash(Arc::new(map));
    Ok(map)
}
