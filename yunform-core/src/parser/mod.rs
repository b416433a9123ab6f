//! Parser - Parse .yf files
//!
//! Convert DSL to resources using pest

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use std::collections::HashMap;
use std::env;

use crate::resource::{Resource, ResourceId, Value};

#[derive(Parser)]
#[grammar = "parser/yunform.pest"]
struct YunformParser;

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Invalid expression at line {line}: {message}")]
    InvalidExpression { line: usize, message: String },

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("Duplicate binding: {0}")]
    DuplicateBinding(String),
}

/// Provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: HashMap<String, Value>,
}

/// Backend configuration for state storage
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend type (e.g., "local")
    pub backend_type: String,
    pub attributes: HashMap<String, Value>,
}

/// Parse result
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub providers: Vec<ProviderConfig>,
    pub backend: Option<BackendConfig>,
    /// Resources and data sources in declaration order
    pub resources: Vec<Resource>,
    pub variables: HashMap<String, Value>,
}

/// Parse context (variable scope)
#[derive(Default)]
struct ParseContext {
    variables: HashMap<String, Value>,
    resource_bindings: HashMap<String, ResourceId>,
}

impl ParseContext {
    fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.resource_bindings.contains_key(name)
    }
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

/// Next child of a pair the grammar guarantees to be present
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, line: usize) -> Result<Pair<'i, Rule>, ParseError> {
    pairs.next().ok_or_else(|| ParseError::InvalidExpression {
        line,
        message: "unexpected end of expression".to_string(),
    })
}

/// Parse a .yf file
pub fn parse(input: &str) -> Result<ParsedFile, ParseError> {
    let pairs = YunformParser::parse(Rule::file, input).map_err(Box::new)?;

    let mut ctx = ParseContext::default();
    let mut parsed = ParsedFile::default();

    for pair in pairs {
        if pair.as_rule() != Rule::file {
            continue;
        }
        for statement in pair.into_inner() {
            if statement.as_rule() != Rule::statement {
                continue;
            }
            for stmt in statement.into_inner() {
                match stmt.as_rule() {
                    Rule::backend_block => {
                        let (backend_type, attributes) = parse_named_block(stmt, &ctx)?;
                        parsed.backend = Some(BackendConfig {
                            backend_type,
                            attributes,
                        });
                    }
                    Rule::provider_block => {
                        let (name, attributes) = parse_named_block(stmt, &ctx)?;
                        parsed.providers.push(ProviderConfig { name, attributes });
                    }
                    Rule::let_binding => parse_let_binding(stmt, &mut ctx, &mut parsed)?,
                    _ => {}
                }
            }
        }
    }

    parsed.variables = ctx.variables;
    Ok(parsed)
}

/// `provider name { ... }` and `backend type { ... }`
fn parse_named_block(
    pair: Pair<Rule>,
    ctx: &ParseContext,
) -> Result<(String, HashMap<String, Value>), ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, line)?.as_str().to_string();

    let mut attributes = HashMap::new();
    for attr_pair in inner {
        if attr_pair.as_rule() == Rule::attribute {
            let (key, value) = parse_attribute(attr_pair, ctx)?;
            attributes.insert(key, value);
        }
    }

    Ok((name, attributes))
}

fn parse_let_binding(
    pair: Pair<Rule>,
    ctx: &mut ParseContext,
    parsed: &mut ParsedFile,
) -> Result<(), ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner, line)?.as_str().to_string();
    let expr = next_pair(&mut inner, line)?;

    if ctx.is_bound(&name) {
        return Err(ParseError::DuplicateBinding(name));
    }

    match expr.as_rule() {
        Rule::resource_expr => {
            let resource = parse_resource_expr(expr, ctx, &name, false)?;
            ctx.resource_bindings.insert(name, resource.id.clone());
            parsed.resources.push(resource);
        }
        Rule::data_source_expr => {
            let resource = parse_resource_expr(expr, ctx, &name, true)?;
            ctx.resource_bindings.insert(name, resource.id.clone());
            parsed.resources.push(resource);
        }
        _ => {
            let value = parse_expression(expr, ctx)?;
            ctx.variables.insert(name, value);
        }
    }

    Ok(())
}

/// `alicloud.vpc { ... }` or `read alicloud.vpcs { ... }`.
/// The binding name becomes the resource name.
fn parse_resource_expr(
    pair: Pair<Rule>,
    ctx: &ParseContext,
    binding_name: &str,
    read_only: bool,
) -> Result<Resource, ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let namespaced_type = next_pair(&mut inner, line)?.as_str().to_string();

    let (provider, resource_type) = match namespaced_type.split_once('.') {
        Some((provider, rest)) if !rest.contains('.') => (provider.to_string(), rest.to_string()),
        _ => return Err(ParseError::InvalidResourceType(namespaced_type)),
    };

    let mut attributes = parse_block_contents(inner, ctx)?;
    attributes.insert("_provider".to_string(), Value::String(provider));
    attributes.insert("_type".to_string(), Value::String(namespaced_type));
    attributes.insert(
        "_binding".to_string(),
        Value::String(binding_name.to_string()),
    );

    Ok(Resource {
        id: ResourceId::new(resource_type, binding_name),
        attributes,
        read_only,
    })
}

/// Parse block contents (attributes and nested blocks).
/// Nested blocks with the same name are collected into a list.
fn parse_block_contents(
    pairs: Pairs<Rule>,
    ctx: &ParseContext,
) -> Result<HashMap<String, Value>, ParseError> {
    let mut attributes: HashMap<String, Value> = HashMap::new();
    let mut nested_blocks: HashMap<String, Vec<Value>> = HashMap::new();

    for content_pair in pairs {
        if content_pair.as_rule() != Rule::block_content {
            continue;
        }
        let line = line_of(&content_pair);
        let inner = next_pair(&mut content_pair.into_inner(), line)?;
        match inner.as_rule() {
            Rule::attribute => {
                let (key, value) = parse_attribute(inner, ctx)?;
                if attributes.insert(key.clone(), value).is_some() {
                    return Err(ParseError::InvalidExpression {
                        line,
                        message: format!("attribute '{}' is set more than once", key),
                    });
                }
            }
            Rule::nested_block => {
                let mut block_inner = inner.into_inner();
                let block_name = next_pair(&mut block_inner, line)?.as_str().to_string();
                let block_attrs = parse_block_contents(block_inner, ctx)?;
                nested_blocks
                    .entry(block_name)
                    .or_default()
                    .push(Value::Map(block_attrs));
            }
            _ => {}
        }
    }

    for (name, blocks) in nested_blocks {
        attributes.insert(name, Value::List(blocks));
    }

    Ok(attributes)
}

fn parse_attribute(pair: Pair<Rule>, ctx: &ParseContext) -> Result<(String, Value), ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let key = next_pair(&mut inner, line)?.as_str().to_string();
    let value = parse_expression(next_pair(&mut inner, line)?, ctx)?;
    Ok((key, value))
}

fn parse_expression(pair: Pair<Rule>, ctx: &ParseContext) -> Result<Value, ParseError> {
    let line = line_of(&pair);
    match pair.as_rule() {
        Rule::expression | Rule::primary => {
            let inner = next_pair(&mut pair.into_inner(), line)?;
            parse_expression(inner, ctx)
        }
        Rule::env_var => {
            let var_name = unescape(next_pair(&mut pair.into_inner(), line)?.as_str());
            env::var(&var_name)
                .map(Value::String)
                .map_err(|_| ParseError::EnvVarNotSet(var_name))
        }
        Rule::list => {
            let items: Result<Vec<Value>, ParseError> = pair
                .into_inner()
                .map(|item| parse_expression(item, ctx))
                .collect();
            Ok(Value::List(items?))
        }
        Rule::map => {
            let mut map = HashMap::new();
            for entry in pair.into_inner() {
                let mut entry_inner = entry.into_inner();
                let key_pair = next_pair(&mut entry_inner, line)?;
                let key = match key_pair.as_rule() {
                    Rule::string => unescape(key_pair.as_str()),
                    _ => key_pair.as_str().to_string(),
                };
                let value = parse_expression(next_pair(&mut entry_inner, line)?, ctx)?;
                map.insert(key, value);
            }
            Ok(Value::Map(map))
        }
        Rule::boolean => Ok(Value::Bool(pair.as_str() == "true")),
        Rule::float => pair
            .as_str()
            .parse()
            .map(Value::Float)
            .map_err(|e| ParseError::InvalidExpression {
                line,
                message: format!("invalid number '{}': {}", pair.as_str(), e),
            }),
        Rule::number => pair
            .as_str()
            .parse()
            .map(Value::Int)
            .map_err(|e| ParseError::InvalidExpression {
                line,
                message: format!("invalid number '{}': {}", pair.as_str(), e),
            }),
        Rule::string => Ok(Value::String(unescape(pair.as_str()))),
        Rule::variable_ref => {
            let mut parts = pair.into_inner();
            let first = next_pair(&mut parts, line)?.as_str();

            match parts.next() {
                // Member access: resolved against the referenced binding later
                Some(attr) => {
                    if ctx.variables.contains_key(first) {
                        return Err(ParseError::InvalidExpression {
                            line,
                            message: format!(
                                "'{}' is not a resource, cannot access attribute '{}'",
                                first,
                                attr.as_str()
                            ),
                        });
                    }
                    Ok(Value::ResourceRef(
                        first.to_string(),
                        attr.as_str().to_string(),
                    ))
                }
                None => {
                    if ctx.resource_bindings.contains_key(first) {
                        return Err(ParseError::InvalidExpression {
                            line,
                            message: format!(
                                "'{}' is a resource, reference one of its attributes",
                                first
                            ),
                        });
                    }
                    ctx.variables
                        .get(first)
                        .cloned()
                        .ok_or_else(|| ParseError::UndefinedVariable(first.to_string()))
                }
            }
        }
        other => Err(ParseError::InvalidExpression {
            line,
            message: format!("unexpected {:?}", other),
        }),
    }
}

/// Strip quotes and process escape sequences
fn unescape(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Resolve resource references in a ParsedFile.
///
/// References to declared attributes are replaced by their values.
/// References to attributes only known after apply (`id`, computed fields,
/// data source results) stay as `ResourceRef`.
pub fn resolve_resource_refs(parsed: &mut ParsedFile) -> Result<(), ParseError> {
    let binding_map: HashMap<String, HashMap<String, Value>> = parsed
        .resources
        .iter()
        .map(|r| (r.binding().to_string(), r.attributes.clone()))
        .collect();

    for resource in &mut parsed.resources {
        for value in resource.attributes.values_mut() {
            *value = resolve_value(value, &binding_map, 0)?;
        }
    }

    Ok(())
}

fn resolve_value(
    value: &Value,
    binding_map: &HashMap<String, HashMap<String, Value>>,
    depth: usize,
) -> Result<Value, ParseError> {
    match value {
        Value::ResourceRef(binding_name, attr_name) => {
            let attributes = binding_map.get(binding_name).ok_or_else(|| {
                ParseError::UndefinedVariable(format!("{}.{}", binding_name, attr_name))
            })?;
            match attributes.get(attr_name) {
                Some(attr_value) if !attr_name.starts_with('_') && depth < binding_map.len() => {
                    resolve_value(attr_value, binding_map, depth + 1)
                }
                _ => Ok(value.clone()),
            }
        }
        Value::List(items) => {
            let resolved: Result<Vec<Value>, ParseError> = items
                .iter()
                .map(|item| resolve_value(item, binding_map, depth))
                .collect();
            Ok(Value::List(resolved?))
        }
        Value::Map(map) => {
            let mut resolved = HashMap::new();
            for (k, v) in map {
                resolved.insert(k.clone(), resolve_value(v, binding_map, depth)?);
            }
            Ok(Value::Map(resolved))
        }
        _ => Ok(value.clone()),
    }
}

/// Parse a .yf file and resolve resource references
pub fn parse_and_resolve(input: &str) -> Result<ParsedFile, ParseError> {
    let mut parsed = parse(input)?;
    resolve_resource_refs(&mut parsed)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn parse_provider_and_backend_blocks() {
        let input = r#"
            backend local {
                path = "state/yunform.state.json"
            }

            provider alicloud {
                region = "cn-hangzhou"
                read_timeout = 60000
            }
        "#;

        let result = parse(input).unwrap();
        assert_eq!(result.providers.len(), 1);
        assert_eq!(result.providers[0].name, "alicloud");
        assert_eq!(
            result.providers[0].attributes.get("read_timeout"),
            Some(&Value::Int(60000))
        );
        let backend = result.backend.unwrap();
        assert_eq!(backend.backend_type, "local");
        assert_eq!(
            backend.attributes.get("path"),
            Some(&s("state/yunform.state.json"))
        );
    }

    #[test]
    fn binding_name_becomes_resource_name() {
        let input = r#"
            let main = alicloud.vpc {
                vpc_name = "main"
                cidr_block = "10.0.0.0/16"
            }
        "#;

        let result = parse(input).unwrap();
        let resource = &result.resources[0];
        assert_eq!(resource.id, ResourceId::new("vpc", "main"));
        assert_eq!(resource.binding(), "main");
        assert_eq!(resource.provider(), Some("alicloud"));
        assert_eq!(resource.attributes.get("_type"), Some(&s("alicloud.vpc")));
        assert!(!resource.is_data_source());
    }

    #[test]
    fn parse_data_source() {
        let input = r#"
            let vpcs = read alicloud.vpcs {
                name_regex = "^prod-"
                ids = ["vpc-1", "vpc-2"]
            }
        "#;

        let result = parse(input).unwrap();
        let resource = &result.resources[0];
        assert!(resource.is_data_source());
        assert_eq!(resource.id.resource_type, "vpcs");
        assert_eq!(
            resource.attributes.get("ids"),
            Some(&Value::List(vec![s("vpc-1"), s("vpc-2")]))
        );
    }

    #[test]
    fn nested_blocks_become_lists_of_maps() {
        let input = r#"
            let rule = alicloud.alb_rule {
                rule_name = "forward"
                rule_conditions {
                    type = "Host"
                    host_config {
                        values = ["example.com"]
                    }
                }
                rule_conditions {
                    type = "Path"
                }
            }
        "#;

        let result = parse(input).unwrap();
        let conditions = result.resources[0]
            .attributes
            .get("rule_conditions")
            .and_then(Value::as_list)
            .unwrap();
        assert_eq!(conditions.len(), 2);
        let host = conditions[0].as_map().unwrap();
        assert_eq!(host.get("type"), Some(&s("Host")));
        assert!(matches!(host.get("host_config"), Some(Value::List(blocks)) if blocks.len() == 1));
    }

    #[test]
    fn parse_scalars_maps_and_comments() {
        let input = r#"
            # network layout
            let base = "10.0.0.0/8"
            let main = alicloud.vpc {
                cidr_block = base      // reuse
                enable_ipv6 = false
                ratio = 0.5
                offset = -3
                tags = { Env = "prod", "cost-center" = "42" }
                description = "line\nbreak \"quoted\""
            }
        "#;

        let result = parse(input).unwrap();
        let attrs = &result.resources[0].attributes;
        assert_eq!(attrs.get("cidr_block"), Some(&s("10.0.0.0/8")));
        assert_eq!(attrs.get("enable_ipv6"), Some(&Value::Bool(false)));
        assert_eq!(attrs.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(attrs.get("offset"), Some(&Value::Int(-3)));
        let tags = attrs.get("tags").and_then(Value::as_map).unwrap();
        assert_eq!(tags.get("cost-center"), Some(&s("42")));
        assert_eq!(
            attrs.get("description"),
            Some(&s("line\nbreak \"quoted\""))
        );
    }

    #[test]
    fn env_var_lookup() {
        // SAFETY: test-only variable with a unique name
        unsafe { env::set_var("YUNFORM_PARSER_TEST_REGION", "cn-beijing") };
        let result = parse(
            r#"provider alicloud { region = env("YUNFORM_PARSER_TEST_REGION") }"#,
        )
        .unwrap();
        assert_eq!(
            result.providers[0].attributes.get("region"),
            Some(&s("cn-beijing"))
        );

        let err = parse(r#"let x = env("YUNFORM_PARSER_TEST_UNSET")"#).unwrap_err();
        assert!(matches!(err, ParseError::EnvVarNotSet(name) if name == "YUNFORM_PARSER_TEST_UNSET"));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = parse("let x = missing").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedVariable(_)));
    }

    #[test]
    fn duplicate_binding_is_an_error() {
        let input = r#"
            let main = alicloud.vpc { vpc_name = "a" }
            let main = alicloud.vpc { vpc_name = "b" }
        "#;
        assert!(matches!(parse(input), Err(ParseError::DuplicateBinding(name)) if name == "main"));
    }

    #[test]
    fn type_without_provider_prefix_is_rejected() {
        let err = parse(r#"let x = alicloud.alb.rule { }"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidResourceType(_)));
    }

    #[test]
    fn syntax_error_is_reported() {
        assert!(matches!(
            parse("let = alicloud.vpc {}"),
            Err(ParseError::Syntax(_))
        ));
    }

    #[test]
    fn resolve_declared_attributes_and_keep_runtime_refs() {
        let input = r#"
            let main = alicloud.vpc {
                vpc_name = "main"
            }
            let vsw = alicloud.vswitch {
                vswitch_name = main.vpc_name
                vpc_id = main.id
            }
        "#;

        let result = parse_and_resolve(input).unwrap();
        let vsw = &result.resources[1].attributes;
        assert_eq!(vsw.get("vswitch_name"), Some(&s("main")));
        assert_eq!(
            vsw.get("vpc_id"),
            Some(&Value::ResourceRef("main".to_string(), "id".to_string()))
        );
    }

    #[test]
    fn reference_to_unknown_binding_fails_resolution() {
        let input = r#"
            let vsw = alicloud.vswitch {
                vpc_id = nowhere.id
            }
        "#;
        assert!(matches!(
            parse_and_resolve(input),
            Err(ParseError::UndefinedVariable(name)) if name == "nowhere.id"
        ));
    }

    #[test]
    fn attribute_access_on_plain_variable_fails() {
        let input = r#"
            let region = "cn-hangzhou"
            let main = alicloud.vpc { vpc_name = region.name }
        "#;
        assert!(matches!(
            parse(input),
            Err(ParseError::InvalidExpression { .. })
        ));
    }
}
