//! In-process stand-in for the ProofAI service and its storage gateway.
//!
//! One warp server answers both surfaces: `/api/*` for the local service and
//! `/fetch`, `/upload` for the gateway, so the gateway address and the API
//! base share a port.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::TryStreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::{Filter, Rejection, Reply};

use proofai_client::{ClientContext, Config, EndpointResolver, SessionManager};

pub const PUBLIC_KEY: &str = "04c1f0a9e2d7b3a8c6e5f4d3b2a1908f7e6d5c4b3a29180f7e6d5c4b3a291807";
pub const PRIVATE_KEY: &str = "30770201010420a3b1c9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0e9f8a7";
pub const OTHER_KEY: &str = "04ffeeddccbbaa99887766554433221100ffeeddccbbaa998877665544332211";
pub const UPLOAD_CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

#[derive(Debug)]
pub struct MockState {
    /// "METHOD /path" for every request received
    pub requests: Vec<String>,
    pub registered_address: String,
    pub logged_in: bool,
    pub role: String,
    pub mining_block: Option<Value>,
    pub mining_transaction: Option<Value>,
    pub mined_blocks: Vec<Value>,
    pub next_nonce: u64,
    pub confirmed: HashSet<(String, u64)>,
    pub uploaded_files: Vec<String>,
    pub fail_uploads: bool,
    /// Served by `/logout` instead of the success reply
    pub logout_failure: Option<(StatusCode, Value)>,
    /// Served by `/setRole` instead of the success reply
    pub role_rejection: Option<(StatusCode, Value)>,
    /// `filterValue` of the last `/getMinedBlocks` request
    pub mined_blocks_filter: Option<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            registered_address: String::new(),
            logged_in: false,
            role: "Miner".to_string(),
            mining_block: None,
            mining_transaction: None,
            mined_blocks: Vec::new(),
            next_nonce: 1,
            confirmed: HashSet::new(),
            uploaded_files: Vec::new(),
            fail_uploads: false,
            logout_failure: None,
            role_rejection: None,
            mined_blocks_filter: None,
        }
    }
}

impl MockState {
    /// Move every submitted transaction into a freshly mined block
    pub fn mine_pending(&mut self) {
        let Some(block) = self.mining_block.take() else {
            return;
        };
        if let Some(txs) = block["transactions"].as_array() {
            for tx in txs {
                let from = tx["from"].as_str().unwrap_or_default().to_string();
                let nonce = tx["nonce"].as_u64().unwrap_or_default();
                self.confirmed.insert((from, nonce));
            }
        }
        self.mined_blocks.push(block);
        self.mining_transaction = None;
    }
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockService {
    pub addr: SocketAddr,
    pub state: Shared,
    server: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl MockService {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) = warp::serve(routes(state.clone()))
            .bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                rx.await.ok();
            });
        let handle = tokio::spawn(server);
        Self {
            addr,
            state,
            server: Mutex::new(Some((tx, handle))),
        }
    }

    /// Stop listening; later requests to this address fail to connect
    pub async fn shutdown(&self) {
        let server = self.server.lock().take();
        if let Some((tx, handle)) = server {
            tx.send(()).ok();
            handle.await.ok();
        }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn config(&self) -> Config {
        let mut config = Config::development();
        config.service.api_base_url = format!("http://{}/api", self.addr);
        config.storage.ephemeral = true;
        config
    }

    pub fn context(&self) -> ClientContext {
        ClientContext::from_config(self.config()).unwrap()
    }

    /// A context that has resolved this mock and logged in
    pub async fn logged_in_context(&self) -> ClientContext {
        let ctx = self.context();
        EndpointResolver::new(ctx.clone()).resolve(&self.address()).await.unwrap();
        SessionManager::new(ctx.clone())
            .login(PUBLIC_KEY, PRIVATE_KEY, false)
            .await
            .unwrap();
        ctx
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }
}

pub fn block_json(number: u64, transactions: Vec<Value>) -> Value {
    json!({
        "transactions": transactions,
        "prev_Hash": "00ab",
        "proposerId": "validator-1",
        "blockNum": number,
        "eventEmit": "",
        "timeStamp": "2024-05-01T10:00:00Z",
        "transactionsHash": "9f86d081",
        "salt": "",
        "difficulty": 3,
        "proof": "",
        "type": "block"
    })
}

pub fn transaction_json(from: &str, nonce: u64, model: &str, dataset: &str) -> Value {
    json!({
        "from": from,
        "nonce": nonce,
        "input_dataSet": dataset,
        "input_model": model,
        "model_output": null,
        "blockId": "",
        "signature": "3045022100",
        "modelFile": "",
        "type": "transaction"
    })
}

fn with_state(state: Shared) -> impl Filter<Extract = (Shared,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_reply(value: Value, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&value), status).into_response()
}

type Form = HashMap<String, String>;

fn api_route(name: &'static str) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path("api").and(warp::path(name)).and(warp::path::end())
}

fn routes(state: Shared) -> warp::filters::BoxedFilter<(warp::reply::Response,)> {
    let recorder = state.clone();
    let log = warp::log::custom(move |info: warp::log::Info| {
        recorder.lock().requests.push(format!("{} {}", info.method(), info.path()));
    });

    let reachability = warp::path("fetch")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| json_reply(json!({ "error": "Method not allowed" }), StatusCode::METHOD_NOT_ALLOWED));

    let fetch = warp::path("fetch")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::form::<Form>())
        .map(|form: Form| {
            let cid = form.get("cid").cloned().unwrap_or_default();
            if cid == UPLOAD_CID {
                json_reply(
                    json!({
                        "success": true,
                        "message": "Files fetched",
                        "files": [
                            { "name": "model.py", "hash": "QmModelFile", "content": "print('train')" },
                            { "name": "data.csv", "hash": "QmDataFile", "content": "a,b\n1,2\n" }
                        ]
                    }),
                    StatusCode::OK,
                )
            } else {
                json_reply(json!({ "success": false, "message": "CID not found" }), StatusCode::OK)
            }
        });

    let upload = warp::path("upload")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::multipart::form().max_length(64 * 1024 * 1024))
        .and(with_state(state.clone()))
        .and_then(handle_upload);

    let set_endpoint = api_route("ServiceMachineIP")
        .and(warp::post())
        .and(warp::body::form::<Form>())
        .and(with_state(state.clone()))
        .map(|form: Form, state: Shared| {
            state.lock().registered_address = form.get("ServiceMachineaddr").cloned().unwrap_or_default();
            json_reply(json!({ "message": "Service machine address set" }), StatusCode::OK)
        });

    let get_endpoint = api_route("GetServiceMachineIP")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: Shared| {
            let address = state.lock().registered_address.clone();
            json_reply(json!({ "serviceMachineIP": address }), StatusCode::OK)
        });

    let login = api_route("login")
        .and(warp::post())
        .and(warp::body::form::<Form>())
        .and(with_state(state.clone()))
        .map(|form: Form, state: Shared| {
            let ok = form.get("PubKey").map(String::as_str) == Some(PUBLIC_KEY)
                && form.get("PrvKey").map(String::as_str) == Some(PRIVATE_KEY);
            if ok {
                let mut state = state.lock();
                state.logged_in = true;
                state.role = "Miner".to_string();
                json_reply(json!({ "login": "Success" }), StatusCode::OK)
            } else {
                json_reply(json!({ "login": "Failed" }), StatusCode::UNAUTHORIZED)
            }
        });

    let logout = api_route("logout")
        .and(warp::post())
        .and(with_state(state.clone()))
        .map(|state: Shared| {
            let mut state = state.lock();
            if let Some((status, body)) = state.logout_failure.clone() {
                return json_reply(body, status);
            }
            state.logged_in = false;
            json_reply(json!({ "logout": "Success" }), StatusCode::OK)
        });

    let generate_keys = api_route("generateKeys")
        .and(warp::post())
        .map(|| json_reply(json!({ "pubKey": OTHER_KEY, "prvKey": "3077020101042011" }), StatusCode::OK));

    let get_role = api_route("getRole")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: Shared| {
            let role = state.lock().role.clone();
            json_reply(json!({ "role": role }), StatusCode::OK)
        });

    let set_role = api_route("setRole")
        .and(warp::post())
        .and(warp::body::form::<Form>())
        .and(with_state(state.clone()))
        .map(|form: Form, state: Shared| {
            let mut state = state.lock();
            if let Some((status, body)) = state.role_rejection.clone() {
                return json_reply(body, status);
            }
            match form.get("role").map(String::as_str) {
                Some(role @ ("Miner" | "Validator")) => {
                    state.role = role.to_string();
                    json_reply(json!({ "role": "Set" }), StatusCode::OK)
                }
                _ => json_reply(json!({ "error": "Invalid role" }), StatusCode::BAD_REQUEST),
            }
        });

    let pubkey = api_route("Pubkey")
        .and(warp::get())
        .map(|| json_reply(json!({ "pubKey": PUBLIC_KEY }), StatusCode::OK));

    let current_block = api_route("getCurrentlyMinBlock")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: Shared| {
            let block = state.lock().mining_block.clone().unwrap_or_else(|| json!("null"));
            json_reply(json!({ "block": block }), StatusCode::OK)
        });

    let current_transaction = api_route("getCurrentlyMinTransaction")
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: Shared| {
            let tx = state.lock().mining_transaction.clone().unwrap_or_else(|| json!("null"));
            json_reply(json!({ "transaction": tx }), StatusCode::OK)
        });

    let new_transaction = api_route("newTransaction")
        .and(warp::post())
        .and(warp::body::form::<Form>())
        .and(with_state(state.clone()))
        .map(|form: Form, state: Shared| {
            let mut state = state.lock();
            let nonce = state.next_nonce;
            state.next_nonce += 1;
            let tx = transaction_json(
                PUBLIC_KEY,
                nonce,
                form.get("modelCID").map(String::as_str).unwrap_or_default(),
                form.get("datasetCID").map(String::as_str).unwrap_or_default(),
            );
            let number = state.mined_blocks.len() as u64 + 1;
            state.mining_transaction = Some(tx.clone());
            state.mining_block = Some(block_json(number, vec![tx.clone()]));
            json_reply(json!({ "transaction": tx }), StatusCode::OK)
        });

    let confirmation = api_route("transactionConfirmation")
        .and(warp::get())
        .and(warp::query::<Form>())
        .and(with_state(state.clone()))
        .map(|query: Form, state: Shared| {
            let from = query.get("from").cloned().unwrap_or_default();
            let nonce = query.get("nonce").and_then(|n| n.parse::<u64>().ok()).unwrap_or_default();
            if state.lock().confirmed.contains(&(from, nonce)) {
                json_reply(json!({ "transaction": "Confirmed" }), StatusCode::OK)
            } else {
                json_reply(json!({ "transaction": "pending" }), StatusCode::ACCEPTED)
            }
        });

    let mined_blocks = api_route("getMinedBlocks")
        .and(warp::get())
        .and(warp::query::<Form>())
        .and(with_state(state.clone()))
        .map(|query: Form, state: Shared| {
            let mut state = state.lock();
            state.mined_blocks_filter = query.get("filterValue").cloned();
            if state.mined_blocks.is_empty() {
                json_reply(json!({ "blocks": "null" }), StatusCode::OK)
            } else {
                json_reply(json!({ "blocks": state.mined_blocks.clone() }), StatusCode::OK)
            }
        });

    let api_routes = set_endpoint
        .or(get_endpoint)
        .unify()
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .or(generate_keys)
        .unify()
        .or(get_role)
        .unify()
        .or(set_role)
        .unify()
        .or(pubkey)
        .unify()
        .or(current_block)
        .unify()
        .or(current_transaction)
        .unify()
        .or(new_transaction)
        .unify()
        .or(confirmation)
        .unify()
        .or(mined_blocks)
        .unify();

    reachability
        .or(fetch)
        .unify()
        .or(upload)
        .unify()
        .or(api_routes)
        .unify()
        .with(log)
        .map(warp::Reply::into_response)
        .boxed()
}

async fn handle_upload(form: FormData, state: Shared) -> Result<warp::reply::Response, Rejection> {
    // Parts are handled one at a time; multer only yields the next part once
    // the previous one is dropped
    let names: Vec<String> = form
        .try_filter_map(file_name)
        .try_collect()
        .await
        .map_err(|_| warp::reject())?;

    if state.lock().fail_uploads {
        return Ok(warp::reply::with_status("Unable to store files", StatusCode::INTERNAL_SERVER_ERROR).into_response());
    }

    if names.is_empty() {
        return Ok(json_reply(json!({ "success": false, "message": "No files received" }), StatusCode::OK));
    }

    state.lock().uploaded_files.extend(names);
    Ok(json_reply(json!({ "success": true, "message": UPLOAD_CID }), StatusCode::OK))
}

async fn file_name(part: Part) -> Result<Option<String>, warp::Error> {
    if part.name() != "files" {
        return Ok(None);
    }
    let name = part.filename().unwrap_or_default().to_string();
    part.stream().try_for_each(|_| async { Ok(()) }).await?;
    Ok(Some(name))
}
