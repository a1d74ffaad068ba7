//! Declarations of the AMGX C API
#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void};

pub type AMGX_RC = c_int;
pub type AMGX_Mode = c_int;
pub type AMGX_SOLVE_STATUS = c_int;
pub type cudaError_t = c_int;

pub const AMGX_RC_OK: AMGX_RC = 0;
pub const CUDA_SUCCESS: cudaError_t = 0;

#[repr(C)]
pub struct AMGX_config_handle_struct {
    _private: [u8; 0],
}
#[repr(C)]
pub struct AMGX_resources_handle_struct {
    _private: [u8; 0],
}
#[repr(C)]
pub struct AMGX_solver_handle_struct {
    _private: [u8; 0],
}
#[repr(C)]
pub struct AMGX_matrix_handle_struct {
    _private: [u8; 0],
}
#[repr(C)]
pub struct AMGX_vector_handle_struct {
    _private: [u8; 0],
}

pub type AMGX_config_handle = *mut AMGX_config_handle_struct;
pub type AMGX_resources_handle = *mut AMGX_resources_handle_struct;
pub type AMGX_solver_handle = *mut AMGX_solver_handle_struct;
pub type AMGX_matrix_handle = *mut AMGX_matrix_handle_struct;
pub type AMGX_vector_handle = *mut AMGX_vector_handle_struct;

#[link(name = "amgxsh")]
extern "C" {
    pub fn AMGX_initialize() -> AMGX_RC;
    pub fn AMGX_initialize_plugins() -> AMGX_RC;
    pub fn AMGX_finalize() -> AMGX_RC;
    pub fn AMGX_finalize_plugins() -> AMGX_RC;
    pub fn AMGX_install_signal_handler() -> AMGX_RC;
    pub fn AMGX_reset_signal_handler() -> AMGX_RC;
    pub fn AMGX_get_error_string(err: AMGX_RC, buf: *mut c_char, buf_len: c_int) -> AMGX_RC;

    pub fn AMGX_config_create(cfg: *mut AMGX_config_handle, options: *const c_char) -> AMGX_RC;
    pub fn AMGX_config_create_from_file(
        cfg: *mut AMGX_config_handle,
        param_file: *const c_char,
    ) -> AMGX_RC;
    pub fn AMGX_config_add_parameters(
        cfg: *mut AMGX_config_handle,
        options: *const c_char,
    ) -> AMGX_RC;
    pub fn AMGX_config_destroy(cfg: AMGX_config_handle) -> AMGX_RC;

    pub fn AMGX_resources_create_simple(
        rsc: *mut AMGX_resources_handle,
        cfg: AMGX_config_handle,
    ) -> AMGX_RC;
    pub fn AMGX_resources_create(
        rsc: *mut AMGX_resources_handle,
        cfg: AMGX_config_handle,
        comm: *mut c_void,
        device_num: c_int,
        devices: *const c_int,
    ) -> AMGX_RC;
    pub fn AMGX_resources_destroy(rsc: AMGX_resources_handle) -> AMGX_RC;

    pub fn AMGX_solver_create(
        slv: *mut AMGX_solver_handle,
        rsc: AMGX_resources_handle,
        mode: AMGX_Mode,
        config_solver: AMGX_config_handle,
    ) -> AMGX_RC;
    pub fn AMGX_solver_destroy(slv: AMGX_solver_handle) -> AMGX_RC;
    pub fn AMGX_solver_setup(slv: AMGX_solver_handle, mtx: AMGX_matrix_handle) -> AMGX_RC;
    pub fn AMGX_solver_solve(
        slv: AMGX_solver_handle,
        rhs: AMGX_vector_handle,
        sol: AMGX_vector_handle,
    ) -> AMGX_RC;
    pub fn AMGX_solver_get_iterations_number(slv: AMGX_solver_handle, n: *mut c_int) -> AMGX_RC;
    pub fn AMGX_solver_get_status(
        slv: AMGX_solver_handle,
        st: *mut AMGX_SOLVE_STATUS,
    ) -> AMGX_RC;

    pub fn AMGX_matrix_create(
        mtx: *mut AMGX_matrix_handle,
        rsc: AMGX_resources_handle,
        mode: AMGX_Mode,
    ) -> AMGX_RC;
    pub fn AMGX_matrix_destroy(mtx: AMGX_matrix_handle) -> AMGX_RC;
    #[allow(clippy::too_many_arguments)]
    pub fn AMGX_matrix_upload_all(
        mtx: AMGX_matrix_handle,
        n: c_int,
        nnz: c_int,
        block_dimx: c_int,
        block_dimy: c_int,
        row_ptrs: *const c_int,
        col_indices: *const c_int,
        data: *const c_void,
        diag_data: *const c_void,
    ) -> AMGX_RC;
    pub fn AMGX_matrix_get_size(
        mtx: AMGX_matrix_handle,
        n: *mut c_int,
        block_dimx: *mut c_int,
        block_dimy: *mut c_int,
    ) -> AMGX_RC;
    #[allow(clippy::too_many_arguments)]
    pub fn AMGX_matrix_comm_from_maps_one_ring(
        mtx: AMGX_matrix_handle,
        allocated_halo_depth: c_int,
        num_neighbors: c_int,
        neighbors: *const c_int,
        send_sizes: *const c_int,
        send_maps: *const *const c_int,
        recv_sizes: *const c_int,
        recv_maps: *const *const c_int,
    ) -> AMGX_RC;

    pub fn AMGX_vector_create(
        vec: *mut AMGX_vector_handle,
        rsc: AMGX_resources_handle,
        mode: AMGX_Mode,
    ) -> AMGX_RC;
    pub fn AMGX_vector_destroy(vec: AMGX_vector_handle) -> AMGX_RC;
    pub fn AMGX_vector_bind(vec: AMGX_vector_handle, mtx: AMGX_matrix_handle) -> AMGX_RC;
    pub fn AMGX_vector_upload(
        vec: AMGX_vector_handle,
        n: c_int,
        block_dim: c_int,
        data: *const c_void,
    ) -> AMGX_RC;
    pub fn AMGX_vector_download(vec: AMGX_vector_handle, data: *mut c_void) -> AMGX_RC;
    pub fn AMGX_vector_get_size(
        vec: AMGX_vector_handle,
        n: *mut c_int,
        block_dim: *mut c_int,
    ) -> AMGX_RC;
}

#[link(name = "cudart")]
extern "C" {
    pub fn cudaGetDeviceCount(count: *mut c_int) -> cudaError_t;
}
