//! BlueZ pairing agent registration (spec.md §4.4).
//!
//! The R10 rejects any pairing attempt carrying the MITM flag, which BlueZ's
//! built-in default agent sets. Registering our own `NoInputNoOutput` agent
//! and making it the default avoids that flag entirely, which is what lets
//! the in-band pairing triggered by the protected notifier's CCCD write
//! succeed.

use crate::error::Result;
use dbus::channel::MatchingReceiver;
use dbus::message::MatchRule;
use dbus::nonblock::SyncConnection;
use dbus_crossroads::{Crossroads, IfaceBuilder};
use std::sync::Arc;

/// Object path this process's pairing agent is served on.
pub(crate) const PATH: &str = "/org/r10bridge/agent";

/// IO capability advertised to `org.bluez.AgentManager1.RegisterAgent`.
/// `NoInputNoOutput` avoids the MITM flag the R10 rejects.
pub(crate) const CAPABILITY: &str = "NoInputNoOutput";

/// Serves the `org.bluez.Agent1` object at [`PATH`] on `connection` for the
/// lifetime of the process. Does not itself call `RegisterAgent` /
/// `RequestDefaultAgent` — the caller does that over its own proxy once this
/// object is being served; see `dbus::BlueZTransport::register_pairing_agent`.
///
/// Every method the `org.bluez.Agent1` interface can dispatch simply
/// accepts: PIN/passkey/confirmation requests never carry a real PIN with
/// `NoInputNoOutput`, so unconditional acceptance is what BlueZ expects from
/// an agent with this capability.
pub async fn serve(connection: Arc<SyncConnection>) -> Result<()> {
    let mut crossroads = Crossroads::new();
    crossroads.set_async_support(Some((
        connection.clone(),
        Box::new(|x| {
            tokio::spawn(x);
        }),
    )));

    let iface_token = crossroads.register("org.bluez.Agent1", |b: &mut IfaceBuilder<()>| {
        b.method_with_cr_async("Release", (), (), |mut ctx, _, _: ()| async move {
            ctx.reply(Ok(()))
        });
        b.method_with_cr_async(
            "RequestPinCode",
            ("device",),
            ("pincode",),
            |mut ctx, _, (_device,): (dbus::Path<'static>,)| async move {
                ctx.reply(Ok(("0000".to_string(),)))
            },
        );
        b.method_with_cr_async(
            "RequestPasskey",
            ("device",),
            ("passkey",),
            |mut ctx, _, (_device,): (dbus::Path<'static>,)| async move { ctx.reply(Ok((0u32,))) },
        );
        b.method_with_cr_async(
            "DisplayPasskey",
            ("device", "passkey", "entered"),
            (),
            |mut ctx, _, (_device, _passkey, _entered): (dbus::Path<'static>, u32, u16)| async move {
                ctx.reply(Ok(()))
            },
        );
        b.method_with_cr_async(
            "DisplayPinCode",
            ("device", "pincode"),
            (),
            |mut ctx, _, (_device, _pincode): (dbus::Path<'static>, String)| async move {
                ctx.reply(Ok(()))
            },
        );
        b.method_with_cr_async(
            "RequestConfirmation",
            ("device", "passkey"),
            (),
            |mut ctx, _, (_device, _passkey): (dbus::Path<'static>, u32)| async move {
                ctx.reply(Ok(()))
            },
        );
        b.method_with_cr_async(
            "RequestAuthorization",
            ("device",),
            (),
            |mut ctx, _, (_device,): (dbus::Path<'static>,)| async move { ctx.reply(Ok(())) },
        );
        b.method_with_cr_async(
            "AuthorizeService",
            ("device", "uuid"),
            (),
            |mut ctx, _, (_device, _uuid): (dbus::Path<'static>, String)| async move {
                ctx.reply(Ok(()))
            },
        );
        b.method_with_cr_async("Cancel", (), (), |mut ctx, _, _: ()| async move { ctx.reply(Ok(())) });
    });

    crossroads.insert(PATH, &[iface_token], ());

    connection.start_receive(
        MatchRule::new_method_call(),
        Box::new(move |msg, conn| {
            crossroads.handle_message(msg, conn).ok();
            true
        }),
    );

    Ok(())
}
