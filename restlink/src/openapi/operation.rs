//! Operation generation from method map entries

use std::collections::BTreeMap;

use http::{Method, StatusCode};
use serde_json::json;

use super::spec::{
    MediaType, Operation, Parameter, ParameterLocation, RequestBody, Response, Schema,
};
use crate::method_map::{MethodSpec, ResponseSpec, RouteShape, SchemaRef};

/// The unique endpoint name of a compiled route, e.g. `api_v1_canal_GET_s`.
pub fn endpoint_name(
    api_name: &str,
    api_version: &str,
    resource: &str,
    verb: &Method,
    shape: RouteShape,
) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        api_name,
        api_version,
        resource,
        verb,
        shape.initial()
    )
}

/// Documents one exposed method of the resource named `resource`.
pub fn build_operation(
    resource: &str,
    shape: RouteShape,
    spec: &MethodSpec,
    operation_id: String,
) -> Operation {
    Operation {
        operation_id: Some(operation_id),
        parameters: parameters(resource, shape, spec),
        request_body: request_body(resource, spec),
        responses: responses(resource, spec),
        ..Default::default()
    }
}

fn parameters(resource: &str, shape: RouteShape, spec: &MethodSpec) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    if shape == RouteShape::Specific {
        parameters.push(Parameter {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            description: Some(format!("{} ID", resource)),
            required: true,
            schema: Some(Schema::Inline(json!({"type": "integer"}))),
        });
    }

    parameters.extend(spec.params.iter().map(|param| Parameter {
        name: param.name.clone(),
        location: ParameterLocation::Query,
        description: Some(param.description.clone()),
        required: param.required,
        schema: None,
    }));
    parameters
}

fn request_body(resource: &str, spec: &MethodSpec) -> Option<RequestBody> {
    spec.data.as_ref().map(|data| RequestBody {
        description: None,
        required: true,
        content: MediaType::json(schema(resource, data)),
    })
}

fn responses(resource: &str, spec: &MethodSpec) -> BTreeMap<String, Response> {
    spec.responses
        .iter()
        .map(|(code, response)| {
            let documented = match response {
                ResponseSpec::Empty => Response {
                    description: "Operation success".to_string(),
                    content: None,
                },
                ResponseSpec::Body(body) => Response {
                    description: describe_status(code),
                    content: Some(MediaType::json(schema(resource, body))),
                },
            };
            (code.clone(), documented)
        })
        .collect()
}

fn schema(resource: &str, schema: &SchemaRef) -> Schema {
    match schema {
        SchemaRef::SelfSchema => Schema::component(resource),
        SchemaRef::Inline(value) => Schema::Inline(value.clone()),
    }
}

fn describe_status(code: &str) -> String {
    StatusCode::from_bytes(code.as_bytes())
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Response")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method_map::MethodMap;

    #[test]
    fn test_endpoint_name() {
        assert_eq!(
            endpoint_name("api", "v1", "canal", &Method::DELETE, RouteShape::Specific),
            "api_v1_canal_DELETE_s"
        );
        assert_eq!(
            endpoint_name("api", "v2", "lock", &Method::GET, RouteShape::General),
            "api_v2_lock_GET_g"
        );
    }

    #[test]
    fn test_specific_get_operation() {
        let map = MethodMap::default();
        let spec = map.get(&Method::GET, RouteShape::Specific).unwrap();
        let op = build_operation("canal", RouteShape::Specific, spec, "op".to_string());
        let value = serde_json::to_value(&op).unwrap();

        assert_eq!(value["operationId"], "op");
        assert_eq!(
            value["parameters"],
            json!([{
                "name": "id",
                "in": "path",
                "description": "canal ID",
                "required": true,
                "schema": {"type": "integer"},
            }])
        );
        assert!(value.get("requestBody").is_none());
        assert_eq!(
            value["responses"]["200"]["content"]["application/json"]["schema"],
            json!({"$ref": "#/components/schemas/canal"})
        );
        assert_eq!(value["responses"]["200"]["description"], "OK");
        assert_eq!(value["responses"]["404"]["description"], "Not Found");
    }

    #[test]
    fn test_list_operation_query_params() {
        let map = MethodMap::default();
        let spec = map.get(&Method::GET, RouteShape::General).unwrap();
        let op = build_operation("canal", RouteShape::General, spec, "op".to_string());

        assert_eq!(op.parameters.len(), 1);
        assert_eq!(op.parameters[0].name, "filter");
        assert_eq!(op.parameters[0].location, ParameterLocation::Query);
        assert!(!op.parameters[0].required);
    }

    #[test]
    fn test_request_body_and_empty_response() {
        let map = MethodMap::default();

        let put = map.get(&Method::PUT, RouteShape::Specific).unwrap();
        let op = build_operation("canal", RouteShape::Specific, put, "op".to_string());
        let body = serde_json::to_value(op.request_body.unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "required": true,
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/canal"}}},
            })
        );

        let delete = map.get(&Method::DELETE, RouteShape::Specific).unwrap();
        let op = build_operation("canal", RouteShape::Specific, delete, "op".to_string());
        let ok = &op.responses["200"];
        assert_eq!(ok.description, "Operation success");
        assert!(ok.content.is_none());
    }

    #[test]
    fn test_unknown_status_description() {
        assert_eq!(describe_status("299"), "Response");
        assert_eq!(describe_status("abc"), "Response");
        assert_eq!(describe_status("403"), "Forbidden");
    }
}
