//! Async operations for the TUI
//!
//! The draw loop never awaits. It hands an [`AsyncCommand`] to the worker,
//! which runs the request on the runtime and answers with an
//! [`AsyncResult`] that the loop feeds back into the matching view.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::auth::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::api::chat::PromptDraft;
use crate::api::media::UploadFile;
use crate::api::posts::PostQuery;
use crate::api::{ApiClient, FormPart, ProgressFn};
use crate::cache::ChannelCache;
use crate::error::ApiError;
use crate::models::{
    Channel, ChannelDraft, ChannelId, ChatMessage, ChatSession, MediaAsset, MediaId, Page, Post,
    PostId, ProfileUpdate, SavedPrompt, ServerMessage, StorageInfo, User,
};
use crate::session::Session;
use crate::views::chat::{SendOutcome, SendPlan};
use crate::views::otp_login::OtpCall;
use crate::views::reset_password::ResetCall;
use crate::views::status::{PostAction, StatusKind};
use crate::views::verify_email::VerifyCall;

/// What an upload's progress belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Post,
    Gallery,
}

/// Commands sent from the TUI to the async worker
#[derive(Debug)]
pub enum AsyncCommand {
    /// Probe `/auth/me/` for the guard and dashboard
    CheckSession,
    Login(LoginRequest),
    Register(RegisterRequest),
    Otp(OtpCall),
    Verify(VerifyCall),
    Reset(ResetCall),
    ChangePassword(ChangePasswordRequest),
    UpdateProfile(ProfileUpdate),
    Logout,

    LoadChannels,
    SaveChannel {
        id: Option<ChannelId>,
        draft: ChannelDraft,
    },
    DeleteChannel(ChannelId),

    LoadPosts {
        kind: StatusKind,
        query: PostQuery,
    },
    PostAction {
        kind: StatusKind,
        action: PostAction,
        id: PostId,
    },
    CreatePost(Vec<FormPart>),
    /// Read a local file to attach to the draft
    Attach(PathBuf),

    LoadMedia,
    UploadMedia(PathBuf),
    DeleteMedia(MediaId),

    LoadChat,
    LoadThread {
        generation: u64,
        id: Uuid,
    },
    SendChat(SendPlan),
    DeleteChatSession(Uuid),
    LoadPrompts,
    SavePrompt {
        id: Option<Uuid>,
        draft: PromptDraft,
    },
    DeletePrompt(Uuid),

    /// Shutdown the worker
    Shutdown,
}

/// Results sent back from the async worker to the TUI
#[derive(Debug)]
pub enum AsyncResult {
    Session(Result<User, ApiError>),
    LoggedIn(Result<ServerMessage, ApiError>),
    Registered(Result<ServerMessage, ApiError>),
    Otp(Result<ServerMessage, ApiError>),
    Verified(Result<ServerMessage, ApiError>),
    Reset(Result<ServerMessage, ApiError>),
    PasswordChanged(Result<ServerMessage, ApiError>),
    ProfileUpdated {
        sent: ProfileUpdate,
        result: Result<ServerMessage, ApiError>,
    },
    LoggedOut(Result<(), ApiError>),

    Channels(Result<Vec<Channel>, ApiError>),
    ChannelSaved(Result<Channel, ApiError>),
    ChannelDeleted {
        id: ChannelId,
        result: Result<(), ApiError>,
    },

    /// A status page, with its channels already in the cache
    Posts {
        kind: StatusKind,
        result: Result<Page<Post>, ApiError>,
    },
    PostActionDone {
        kind: StatusKind,
        action: PostAction,
        id: PostId,
        result: Result<(), ApiError>,
    },
    PostCreated(Result<Option<Post>, ApiError>),
    Attached(Result<UploadFile, ApiError>),

    Media {
        list: Result<Vec<MediaAsset>, ApiError>,
        storage: Result<StorageInfo, ApiError>,
    },
    UploadStarted(UploadFile),
    MediaUploaded(Result<Option<MediaAsset>, ApiError>),
    MediaDeleted {
        id: MediaId,
        result: Result<(), ApiError>,
    },

    /// Bytes sent so far for the running multipart body
    Progress {
        target: UploadTarget,
        sent: u64,
        total: u64,
    },

    ChatSessions(Result<Vec<ChatSession>, ApiError>),
    Thread {
        generation: u64,
        result: Result<Vec<ChatMessage>, ApiError>,
    },
    ChatReplied {
        plan: SendPlan,
        outcome: SendOutcome,
    },
    ChatSessionDeleted {
        id: Uuid,
        result: Result<(), ApiError>,
    },
    Prompts(Result<Vec<SavedPrompt>, ApiError>),
    PromptSaved(Result<SavedPrompt, ApiError>),
    PromptDeleted {
        id: Uuid,
        result: Result<(), ApiError>,
    },
}

/// Channel handles for communicating with the async worker
pub struct AsyncHandle {
    /// Send commands to the worker
    pub cmd_tx: mpsc::Sender<AsyncCommand>,
    /// Receive results from the worker
    pub result_rx: mpsc::Receiver<AsyncResult>,
}

/// Spawn the async worker and return handles
///
/// Each command runs as its own task so a slow chat reply does not hold
/// up list loads; views drop answers that arrive too late.
pub fn spawn_worker(session: Arc<Session>, cache: Arc<ChannelCache>) -> AsyncHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<AsyncCommand>(32);
    let (result_tx, result_rx) = mpsc::channel::<AsyncResult>(64);

    tokio::spawn(async move {
        while let Some(cmd) = cmd_rx.recv().await {
            if matches!(cmd, AsyncCommand::Shutdown) {
                break;
            }
            let session = session.clone();
            let cache = cache.clone();
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                let logout = matches!(cmd, AsyncCommand::Logout);
                let persist = touches_session(&cmd);
                for result in handle(&session.api, &cache, &result_tx, cmd).await {
                    if result_tx.send(result).await.is_err() {
                        debug!("TUI gone, dropping result");
                        return;
                    }
                }
                let saved = if logout {
                    session.forget()
                } else if persist {
                    session.persist()
                } else {
                    Ok(())
                };
                if let Err(err) = saved {
                    warn!(error = %err, "could not save the session");
                }
            });
        }
        if let Err(err) = session.persist() {
            warn!(error = %err, "could not save the session");
        }
    });

    AsyncHandle { cmd_tx, result_rx }
}

/// Commands after which the cookie jar may hold new tokens
const fn touches_session(cmd: &AsyncCommand) -> bool {
    matches!(
        cmd,
        AsyncCommand::Login(_)
            | AsyncCommand::Otp(_)
            | AsyncCommand::Verify(_)
            | AsyncCommand::CheckSession
    )
}

/// Progress callback that forwards to the TUI without blocking the upload
fn progress_to(result_tx: &mpsc::Sender<AsyncResult>, target: UploadTarget) -> ProgressFn {
    let tx = result_tx.clone();
    Arc::new(move |sent: u64, total: u64| {
        // A full queue only costs a skipped frame of the progress bar
        let _ = tx.try_send(AsyncResult::Progress {
            target,
            sent,
            total,
        });
    })
}

async fn handle(
    api: &ApiClient,
    cache: &ChannelCache,
    result_tx: &mpsc::Sender<AsyncResult>,
    cmd: AsyncCommand,
) -> Vec<AsyncResult> {
    let result = match cmd {
        AsyncCommand::Shutdown => return Vec::new(),
        AsyncCommand::CheckSession => AsyncResult::Session(api.me().await),
        AsyncCommand::Login(request) => AsyncResult::LoggedIn(api.login(&request).await),
        AsyncCommand::Register(request) => AsyncResult::Registered(api.register(&request).await),
        AsyncCommand::Otp(call) => AsyncResult::Otp(match call {
            OtpCall::Request(request) => api.request_otp(&request).await,
            OtpCall::Login(request) => api.login_with_otp(&request).await,
        }),
        AsyncCommand::Verify(call) => AsyncResult::Verified(match call {
            VerifyCall::Request(request) => api.request_otp(&request).await,
            VerifyCall::Verify(request) => api.verify_otp(&request).await,
        }),
        AsyncCommand::Reset(call) => AsyncResult::Reset(match call {
            ResetCall::Request(request) => api.request_otp(&request).await,
            ResetCall::Reset(request) => api.reset_password(&request).await,
        }),
        AsyncCommand::ChangePassword(request) => {
            AsyncResult::PasswordChanged(api.change_password(&request).await)
        }
        AsyncCommand::UpdateProfile(sent) => {
            let result = api.update_profile(&sent).await;
            AsyncResult::ProfileUpdated { sent, result }
        }
        AsyncCommand::Logout => AsyncResult::LoggedOut(api.logout().await),

        AsyncCommand::LoadChannels => AsyncResult::Channels(api.channels().await),
        AsyncCommand::SaveChannel { id, draft } => AsyncResult::ChannelSaved(match id {
            Some(id) => api.update_channel(id, &draft).await,
            None => api.create_channel(&draft).await,
        }),
        AsyncCommand::DeleteChannel(id) => AsyncResult::ChannelDeleted {
            id,
            result: api.delete_channel(id).await,
        },

        AsyncCommand::LoadPosts { kind, query } => {
            let result = api.posts(&query).await;
            if let Ok(page) = &result {
                let ids: Vec<_> = page
                    .results
                    .iter()
                    .flat_map(|p| p.channels.iter().copied())
                    .collect();
                cache.resolve(api, &ids).await;
            }
            AsyncResult::Posts { kind, result }
        }
        AsyncCommand::PostAction { kind, action, id } => AsyncResult::PostActionDone {
            kind,
            action,
            id,
            result: action.run(api, id).await,
        },
        AsyncCommand::CreatePost(parts) => {
            let progress = progress_to(result_tx, UploadTarget::Post);
            AsyncResult::PostCreated(api.create_post(parts, Some(progress)).await)
        }
        AsyncCommand::Attach(path) => AsyncResult::Attached(UploadFile::read(&path).await),

        AsyncCommand::LoadMedia => {
            let (list, storage) = tokio::join!(api.media_list(), api.storage_info());
            AsyncResult::Media { list, storage }
        }
        AsyncCommand::UploadMedia(path) => {
            let file = match UploadFile::read(&path).await {
                Ok(file) => file,
                Err(err) => return vec![AsyncResult::MediaUploaded(Err(err))],
            };
            let _ = result_tx.send(AsyncResult::UploadStarted(file.clone())).await;
            let progress = progress_to(result_tx, UploadTarget::Gallery);
            AsyncResult::MediaUploaded(api.upload_media(&file, Some(progress)).await)
        }
        AsyncCommand::DeleteMedia(id) => {
            let result = api.delete_media(id).await;
            if result.is_ok() {
                let storage = api.storage_info().await;
                return vec![
                    AsyncResult::MediaDeleted { id, result },
                    AsyncResult::Media {
                        list: api.media_list().await,
                        storage,
                    },
                ];
            }
            AsyncResult::MediaDeleted { id, result }
        }

        AsyncCommand::LoadChat => {
            let (sessions, prompts) = tokio::join!(api.chat_sessions(), api.prompts());
            return vec![
                AsyncResult::ChatSessions(sessions),
                AsyncResult::Prompts(prompts),
            ];
        }
        AsyncCommand::LoadThread { generation, id } => AsyncResult::Thread {
            generation,
            result: api.chat_messages(id).await,
        },
        AsyncCommand::SendChat(plan) => {
            let outcome = plan.run(api).await;
            AsyncResult::ChatReplied { plan, outcome }
        }
        AsyncCommand::DeleteChatSession(id) => AsyncResult::ChatSessionDeleted {
            id,
            result: api.delete_chat_session(id).await,
        },
        AsyncCommand::LoadPrompts => AsyncResult::Prompts(api.prompts().await),
        AsyncCommand::SavePrompt { id, draft } => AsyncResult::PromptSaved(match id {
            Some(id) => api.update_prompt(id, &draft).await,
            None => api.create_prompt(&draft).await,
        }),
        AsyncCommand::DeletePrompt(id) => AsyncResult::PromptDeleted {
            id,
            result: api.delete_prompt(id).await,
        },
    };
    vec![result]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{client, ok};
    use serde_json::json;

    #[tokio::test]
    async fn test_load_posts_warms_the_channel_cache() {
        let (api, mock, _) = client();
        mock.on(
            Method::Get,
            "/posts/?page=1&page_size=10&status=sent",
            ok(json!({"count": 1, "results": [{"id": 9, "status": "sent", "channels": [4]}]})),
        );
        mock.on(
            Method::Get,
            "/channels/4/",
            ok(json!({"id": 4, "name": "News", "username": "@news", "platform": "bale"})),
        );
        let cache = ChannelCache::new();
        let (tx, _rx) = mpsc::channel(8);
        let query = crate::views::StatusView::new(StatusKind::Sent).query();

        let results = handle(&api, &cache, &tx, AsyncCommand::LoadPosts {
            kind: StatusKind::Sent,
            query,
        })
        .await;

        assert!(matches!(
            results.as_slice(),
            [AsyncResult::Posts { kind: StatusKind::Sent, result: Ok(_) }]
        ));
        assert_eq!(cache.labels(&[4]), vec!["News".to_string()]);
    }

    #[tokio::test]
    async fn test_load_chat_answers_sessions_then_prompts() {
        let (api, mock, _) = client();
        mock.on(Method::Get, "/chat/sessions/", ok(json!({"data": []})));
        mock.on(Method::Get, "/chat/prompts/", ok(json!({"data": []})));
        let (tx, _rx) = mpsc::channel(8);

        let results = handle(&api, &ChannelCache::new(), &tx, AsyncCommand::LoadChat).await;

        assert!(matches!(
            results.as_slice(),
            [AsyncResult::ChatSessions(_), AsyncResult::Prompts(_)]
        ));
    }

    #[test]
    fn test_auth_commands_persist_the_session() {
        assert!(touches_session(&AsyncCommand::CheckSession));
        assert!(!touches_session(&AsyncCommand::LoadMedia));
    }
}
