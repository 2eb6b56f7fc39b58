use async_trait::async_trait;
use beru_core::{ChatId, KeyValueStore, Message, Messenger, UserId, keys};
use beru_session::{ActionError, TerminalAction, directory::parse_id, registry::response_at};
use futures::future::try_join_all;

use crate::context::HandlerContext;

/// Reply when someone other than the owner touches the admin set.
fn access_denied(title: &str) -> String {
    format!("You don't have admin management access for {title}.")
}

/// Resolve the active chat and make sure the sender owns it.
async fn owned_chat<S, M>(
    ctx: &HandlerContext<S, M>,
    msg: &Message,
) -> Result<(ChatId, String), ActionError>
where
    S: KeyValueStore,
    M: Messenger,
{
    let (chat, title) = ctx.active_chat(msg).await?;
    if !ctx.directory.has_admin_access(msg.sender.id, chat).await? {
        ctx.reply(msg, &access_denied(&title)).await;
        return Err(ActionError::Forbidden(msg.sender.id));
    }
    Ok((chat, title))
}

/// The user id carried by a pressed admin button.
async fn picked_user<S, M>(ctx: &HandlerContext<S, M>, msg: &Message) -> Result<UserId, ActionError>
where
    S: KeyValueStore,
    M: Messenger,
{
    if let Ok(id) = parse_id("response", &msg.text) {
        return Ok(id);
    }
    ctx.reply(msg, "Please pick someone from the keyboard.").await;
    Err(ActionError::InvalidInput(format!("not a user id: {}", msg.text)))
}

action! {
    /// Grant a platform admin access to manage the bot for the active chat.
    AddAdmin
}

#[async_trait]
impl<S, M> TerminalAction for AddAdmin<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = owned_chat(&self.ctx, msg).await?;
                let admin = picked_user(&self.ctx, msg).await?;

                self.ctx
                    .store
                    .set_add(&keys::chat_active_admins(chat), &admin.to_string())
                    .await?;
                self.ctx
                    .store
                    .set_add(&keys::user_chats(admin), &chat.to_string())
                    .await?;
                tracing::info!(chat, admin, owner = msg.sender.id, "admin added");

                let name = self.ctx.directory.user_display_name(admin).await?;
                self.ctx
                    .reply(msg, &format!("{name} can now manage {title}."))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Revoke an admin's access to manage the bot for the active chat.
    RemoveAdmin
}

#[async_trait]
impl<S, M> TerminalAction for RemoveAdmin<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = owned_chat(&self.ctx, msg).await?;
                let admin = picked_user(&self.ctx, msg).await?;
                if admin == msg.sender.id {
                    self.ctx
                        .reply(msg, "You can't remove yourself, you own this chat.")
                        .await;
                    return Err(ActionError::InvalidInput("owner cannot remove itself".into()));
                }

                let removed = self
                    .ctx
                    .store
                    .set_remove(&keys::chat_active_admins(chat), &admin.to_string())
                    .await?;
                self.ctx
                    .store
                    .set_remove(&keys::user_chats(admin), &chat.to_string())
                    .await?;

                let name = self.ctx.directory.user_display_name(admin).await?;
                if !removed {
                    self.ctx
                        .reply(msg, &format!("{name} wasn't an admin of {title}."))
                        .await;
                    return Err(ActionError::MissingKey(keys::chat_active_admins(chat)));
                }
                tracing::info!(chat, admin, owner = msg.sender.id, "admin removed");
                self.ctx
                    .reply(msg, &format!("{name} can no longer manage {title}."))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// List who may manage the bot for the active chat.
    ViewAdmins
}

#[async_trait]
impl<S, M> TerminalAction for ViewAdmins<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;

                let key = keys::chat_active_admins(chat);
                let mut ids = Vec::new();
                for raw in self.ctx.store.set_members(&key).await? {
                    ids.push(parse_id(&key, &raw)?);
                }
                let directory = &self.ctx.directory;
                let mut names =
                    try_join_all(ids.into_iter().map(|id| directory.user_display_name(id))).await?;
                names.sort();

                let text = if names.is_empty() {
                    format!("Nobody can manage {title} yet.")
                } else {
                    format!("Admins for {title}: {}", names.join(", "))
                };
                self.ctx.reply(msg, &text).await;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use beru_core::User;

    use super::*;
    use crate::actions::test_support::{alice, ctx, last_text, owner_of_team, said};

    #[tokio::test]
    async fn test_add_admin_grants_access() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        ctx.directory.remember_user(&User::new(2, "bob")).await.unwrap();

        AddAdmin::new(ctx.clone()).invoke(&said(&["2"])).await.unwrap();

        assert!(
            ctx.store
                .set_contains(&keys::chat_active_admins(-100), "2")
                .await
                .unwrap()
        );
        assert_eq!(ctx.directory.user_chats(2).await.unwrap(), vec![-100]);
        assert_eq!(last_text(&ctx), "bob can now manage Team.");
    }

    #[tokio::test]
    async fn test_add_admin_by_non_owner_is_refused() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        ctx.directory.set_active_chat(2, -100).await.unwrap();
        let msg = Message::private(User::new(2, "bob"), "3");

        let err = AddAdmin::new(ctx.clone()).invoke(&[msg]).await.unwrap_err();

        assert!(matches!(err, ActionError::Forbidden(2)));
        assert_eq!(last_text(&ctx), "You don't have admin management access for Team.");
        assert!(
            !ctx.store
                .set_contains(&keys::chat_active_admins(-100), "3")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_add_admin_rejects_free_text() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        let err = AddAdmin::new(ctx).invoke(&said(&["bob"])).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_remove_admin() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        AddAdmin::new(ctx.clone()).invoke(&said(&["2"])).await.unwrap();

        RemoveAdmin::new(ctx.clone()).invoke(&said(&["2"])).await.unwrap();
        assert_eq!(last_text(&ctx), "2 can no longer manage Team.");
        assert!(ctx.directory.user_chats(2).await.unwrap().is_empty());

        let err = RemoveAdmin::new(ctx.clone())
            .invoke(&said(&["2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::MissingKey(_)));
    }

    #[tokio::test]
    async fn test_owner_cannot_remove_itself() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        assert!(RemoveAdmin::new(ctx.clone()).invoke(&said(&["1"])).await.is_err());
        assert!(
            ctx.store
                .set_contains(&keys::chat_active_admins(-100), "1")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_view_admins_lists_names() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        ctx.directory.remember_user(&alice()).await.unwrap();
        ctx.directory.remember_user(&User::new(2, "bob")).await.unwrap();
        AddAdmin::new(ctx.clone()).invoke(&said(&["2"])).await.unwrap();

        ViewAdmins::new(ctx.clone()).invoke(&said(&["/viewadmins"])).await.unwrap();
        assert_eq!(last_text(&ctx), "Admins for Team: alice, bob");
    }

    #[tokio::test]
    async fn test_without_active_chat_user_is_told() {
        let ctx = ctx();
        let err = ViewAdmins::new(ctx.clone())
            .invoke(&said(&["/viewadmins"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Directory(_)));
        assert_eq!(last_text(&ctx), crate::context::NO_ACTIVE_CHAT);
    }
}
