//! Request handlers for the long-polling transport.

use crate::error::{DecodeError, SessionClosed};
use crate::payload::Payload;
use crate::socket::Socket;

/// Serve a polling `GET`: wait for at least one outbound packet, then
/// drain whatever else is already queued. Order within the response is
/// dequeue order.
pub(crate) async fn poll(socket: &Socket) -> Result<Payload, SessionClosed> {
    let transport = socket.current_transport().await;

    let first = transport.recv_outbound().await?;
    let mut packets = vec![first];
    while let Some(packet) = transport.try_recv_outbound() {
        packets.push(packet);
    }

    tracing::debug!(sid = %socket.id(), count = packets.len(), "poll drained");
    Ok(Payload::new(packets))
}

/// Serve a polling `POST`: parse the body as a payload and append every
/// packet to the inbound queue in order.
pub(crate) async fn receive(socket: &Socket, body: &[u8]) -> Result<(), DecodeError> {
    let payload = Payload::parse(body)?;
    let transport = socket.current_transport().await;

    tracing::debug!(sid = %socket.id(), count = payload.packets().len(), "payload received");
    for packet in payload {
        // A teardown mid-request discards the remainder.
        if transport.send_inbound(packet).await.is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::packet::{Packet, PacketType};
    use crate::socket::SessionId;

    #[tokio::test]
    async fn poll_returns_everything_queued_in_order() {
        let socket = Socket::new(SessionId::generate());
        let transport = socket.current_transport().await;
        transport
            .enqueue_outbound(Packet::message(&b"a"[..]))
            .expect("enqueue");
        transport
            .enqueue_outbound(Packet::message(&b"b"[..]))
            .expect("enqueue");
        transport.enqueue_outbound(Packet::noop()).expect("enqueue");

        let payload = poll(&socket).await.expect("poll");
        let types: Vec<_> = payload.packets().iter().map(|p| p.packet_type).collect();
        assert_eq!(
            types,
            [PacketType::Message, PacketType::Message, PacketType::Noop]
        );
        assert_eq!(payload.packets()[0].data.as_ref(), b"a");
        assert_eq!(payload.packets()[1].data.as_ref(), b"b");
    }

    #[tokio::test]
    async fn poll_blocks_until_a_packet_arrives() {
        let socket = Socket::new(SessionId::generate());
        let transport = socket.current_transport().await;

        let waiter = tokio::spawn({
            let socket = socket.clone();
            async move { poll(&socket).await }
        });
        tokio::task::yield_now().await;

        transport.enqueue_outbound(Packet::noop()).expect("enqueue");
        let payload = waiter.await.expect("join").expect("poll");
        assert_eq!(payload.packets().len(), 1);
    }

    #[tokio::test]
    async fn receive_appends_packets_in_order() {
        let socket = Socket::new(SessionId::generate());
        let transport = socket.current_transport().await;

        let body = Payload::new(vec![
            Packet::message(&b"first"[..]),
            Packet::message(&b"second"[..]),
        ])
        .encode();
        receive(&socket, &body).await.expect("receive");

        assert_eq!(
            transport.recv_inbound().await.expect("recv").data.as_ref(),
            b"first"
        );
        assert_eq!(
            transport.recv_inbound().await.expect("recv").data.as_ref(),
            b"second"
        );
    }

    #[tokio::test]
    async fn receive_rejects_garbage() {
        let socket = Socket::new(SessionId::generate());
        assert!(receive(&socket, b"not a payload").await.is_err());
    }

    #[tokio::test]
    async fn poll_fails_once_the_session_closes() {
        let socket = Socket::new(SessionId::generate());
        socket.close().await;
        assert!(poll(&socket).await.is_err());
    }
}
