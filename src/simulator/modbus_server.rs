// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the homectrl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server exposing a simulated pin board
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the simulated board,
//! the client is the `homectrl` controller.

use std::{
    future,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use super::image::DeviceImage;

/// Board image shared between the server and its owner
pub type SharedImage = Arc<Mutex<DeviceImage>>;

/// `tokio_modbus` service answering requests from a [`DeviceImage`]
#[derive(Clone)]
pub struct HomectrlModbusServer {
    image: SharedImage,
}

impl tokio_modbus::server::Service for HomectrlModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("SERVER: {req:?}");
        let res = match self.lock() {
            Ok(mut image) => match req {
                Request::ReadCoils(addr, cnt) => {
                    image.read_coils(addr, cnt).map(Response::ReadCoils)
                }
                Request::WriteSingleCoil(addr, value) => image
                    .write_coil(addr, value)
                    .map(|_| Response::WriteSingleCoil(addr, value)),
                Request::ReadInputRegisters(addr, cnt) => image
                    .read_input_registers(addr, cnt)
                    .map(Response::ReadInputRegisters),
                Request::ReadHoldingRegisters(addr, cnt) => image
                    .read_holding_registers(addr, cnt)
                    .map(Response::ReadHoldingRegisters),
                Request::WriteSingleRegister(addr, value) => image
                    .write_holding_register(addr, value)
                    .map(|_| Response::WriteSingleRegister(addr, value)),
                Request::WriteMultipleRegisters(addr, values) => {
                    write_registers(&mut image, addr, &values)
                        .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
                }
                _ => {
                    error!("SERVER: Exception::IllegalFunction - Unimplemented function code in request: {req:?}");
                    Err(ExceptionCode::IllegalFunction)
                }
            },
            Err(exception) => Err(exception),
        };
        if let Err(exception) = &res {
            debug!("SERVER: answering with {exception:?}");
        }
        future::ready(res)
    }
}

impl HomectrlModbusServer {
    pub fn new(image: DeviceImage) -> Self {
        Self::with_image(Arc::new(Mutex::new(image)))
    }

    /// Serve an image that the caller keeps a handle on
    pub fn with_image(image: SharedImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> SharedImage {
        Arc::clone(&self.image)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceImage>, ExceptionCode> {
        self.image.lock().map_err(|_| {
            error!("SERVER: device image lock poisoned");
            ExceptionCode::ServerDeviceFailure
        })
    }
}

/// Writes stop at the first rejected register, like the firmware.
fn write_registers(
    image: &mut DeviceImage,
    addr: u16,
    values: &[u16],
) -> Result<(), ExceptionCode> {
    for (i, value) in values.iter().enumerate() {
        let reg_addr = addr
            .checked_add(i as u16)
            .ok_or(ExceptionCode::IllegalDataAddress)?;
        image.write_holding_register(reg_addr, *value)?;
    }
    Ok(())
}

/// Bind the simulator listener.
///
/// `address` may be an IP literal or a hostname such as `localhost`; it is
/// resolved together with `port`.
pub async fn bind(address: &str, port: u16) -> Result<TcpListener> {
    debug!("Binding simulator to {} port {}", address, port);
    TcpListener::bind((address, port))
        .await
        .with_context(|| format!("Failed to bind {} port {}", address, port))
}

/// Serve `server` over Modbus TCP on an already bound listener.
///
/// Every connection shares the same board image. Runs until the listener
/// fails or the task is aborted.
pub async fn serve(listener: TcpListener, server: HomectrlModbusServer) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .context("Failed to read the listener address")?;
    info!("Simulated board listening on {}", local_addr);

    let server_instance = Server::new(listener);

    let on_connected = move |stream, socket_addr: SocketAddr| {
        let service = server.clone();
        async move {
            info!("Client connected from {}", socket_addr);
            accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                Ok(Some(service.clone()))
            })
        }
    };

    let on_process_error = |err| {
        error!("Modbus server error: {err}");
    };

    server_instance
        .serve(&on_connected, on_process_error)
        .await
        .context("Modbus server stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ProtocolVersion;
    use tokio_modbus::server::Service;

    fn server() -> HomectrlModbusServer {
        HomectrlModbusServer::new(DeviceImage::new(ProtocolVersion::V2.layout(), 4, 1).unwrap())
    }

    #[tokio::test]
    async fn test_bind_resolves_hostnames() {
        let listener = bind("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());

        let listener = bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);

        assert!(bind("not a host", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_reads_number_of_pins() {
        let response = server()
            .call(Request::ReadInputRegisters(0, 1))
            .await
            .unwrap();
        assert_eq!(response, Response::ReadInputRegisters(vec![4]));
    }

    #[tokio::test]
    async fn test_rejects_magic_write() {
        let result = server().call(Request::WriteSingleRegister(0, 1)).await;
        assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));
    }

    #[tokio::test]
    async fn test_unsupported_function() {
        let result = server().call(Request::ReadDiscreteInputs(0, 1)).await;
        assert_eq!(result, Err(ExceptionCode::IllegalFunction));
    }

    #[tokio::test]
    async fn test_write_multiple_stops_at_first_error() {
        let server = server();
        let values = vec![0x01, 0x100];
        let result = server
            .call(Request::WriteMultipleRegisters(8, values.into()))
            .await;
        assert_eq!(result, Err(ExceptionCode::IllegalDataValue));
        let image = server.image();
        let image = image.lock().unwrap();
        assert_eq!(image.read_holding_registers(8, 2).unwrap(), vec![0x01, 0]);
    }
}
