// HTTP entry points used by the node-lifecycle controller
use crate::resolver::flex_resolver::FlexResolver;
use crate::resolver::resolver_error::ResolveError;
use crate::resolver::timed_cache::CacheReadType;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeScaleSetId {
    node_name: String,
    scale_set_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VmNodeName {
    vm_name: String,
    node_name: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/nodes/{node}/scale-set-id", web::get().to(get_node_scale_set_id))
        .route("/nodes/{node}/scale-set", web::get().to(get_node_scale_set))
        .route("/nodes/{node}/vm", web::get().to(get_node_vm))
        .route("/nodes/{node}/cache", web::delete().to(delete_node_cache))
        .route("/vms/{vm}/node", web::get().to(get_vm_node_name))
        .route("/scale-sets/{name}", web::get().to(get_scale_set_by_name));
}

fn error_response(err: ResolveError) -> HttpResponse {
    if err.is_not_found() {
        HttpResponse::NotFound().body(err.to_string())
    } else {
        log::error!("resolve failed: {}", err);
        HttpResponse::BadGateway().body(err.to_string())
    }
}

pub async fn get_node_scale_set_id(
    node: web::Path<String>,
    resolver: web::Data<FlexResolver>,
) -> impl Responder {
    let node_name = node.into_inner();
    match resolver.get_node_scale_set_id(&node_name).await {
        Ok(scale_set_id) => HttpResponse::Ok().json(NodeScaleSetId {
            node_name,
            scale_set_id,
        }),
        Err(e) => error_response(e),
    }
}

pub async fn get_node_scale_set(
    node: web::Path<String>,
    resolver: web::Data<FlexResolver>,
) -> impl Responder {
    match resolver
        .get_scale_set_by_node_name(&node, CacheReadType::Default)
        .await
    {
        Ok(scale_set) => HttpResponse::Ok().json(scale_set),
        Err(e) => error_response(e),
    }
}

pub async fn get_node_vm(
    node: web::Path<String>,
    resolver: web::Data<FlexResolver>,
) -> impl Responder {
    match resolver.get_vm(&node, CacheReadType::Default).await {
        Ok(vm) => HttpResponse::Ok().json(vm.as_ref()),
        Err(e) => error_response(e),
    }
}

pub async fn get_vm_node_name(
    vm: web::Path<String>,
    resolver: web::Data<FlexResolver>,
) -> impl Responder {
    let vm_name = vm.into_inner();
    match resolver.get_node_name_by_vm_name(&vm_name).await {
        Ok(node_name) => HttpResponse::Ok().json(VmNodeName { vm_name, node_name }),
        Err(e) => error_response(e),
    }
}

pub async fn get_scale_set_by_name(
    name: web::Path<String>,
    resolver: web::Data<FlexResolver>,
) -> impl Responder {
    match resolver.get_scale_set_by_name(&name).await {
        Ok(scale_set) => HttpResponse::Ok().json(scale_set),
        Err(e) => error_response(e),
    }
}

/// Called once a node is confirmed deleted.
pub async fn delete_node_cache(
    node: web::Path<String>,
    resolver: web::Data<FlexResolver>,
) -> impl Responder {
    resolver.invalidate_node(&node);
    HttpResponse::NoContent().finish()
}
